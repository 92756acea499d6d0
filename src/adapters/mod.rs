//! Adapters for the debate runner, agent turn, and expert matcher ports.

pub mod matchers;
pub mod runners;
pub mod turns;
