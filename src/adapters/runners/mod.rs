//! Debate runner adapters.

pub mod mock;

pub use mock::{MockDebateRunner, MockOutcome};
