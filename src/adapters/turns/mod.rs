//! Agent turn provider adapters.

pub mod simulated;

pub use simulated::SimulatedTurnProvider;
