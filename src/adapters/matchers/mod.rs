//! Expert matcher adapters.

pub mod roster;

pub use roster::RosterMatcher;
