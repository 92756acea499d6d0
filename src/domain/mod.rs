//! Domain layer for the Agora debate orchestration engine
//!
//! This module contains the data model, the error taxonomy, and the ports to
//! external collaborators (debate runner, agent turns, expert matching).

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
