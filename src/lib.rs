//! Agora - Debate Orchestration Engine
//!
//! Agora turns one open question into a structured plan of multi-agent
//! sub-debates, runs the plan, and folds the results into a single
//! conclusion.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): data model, error taxonomy, and ports
//! - **Service Layer** (`services`): signal detection, pattern scoring,
//!   structure generation, phase execution, the round state machine, and
//!   result synthesis
//! - **Adapters** (`adapters`): mock and simulated implementations of the ports
//! - **Infrastructure Layer** (`infrastructure`): configuration and logging
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agora::adapters::turns::SimulatedTurnProvider;
//! use agora::services::{DebateOrchestrator, RoundStateMachine};
//! use agora::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let runner = RoundStateMachine::new(Arc::new(SimulatedTurnProvider::new()), &config);
//!     let orchestrator = DebateOrchestrator::new(Arc::new(runner), &config);
//!     let result = orchestrator.run("¿Madrid, Lisboa o Berlín?").await?;
//!     println!("{}", result.conclusion.narrative);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{
    Config, DebateStructure, ExecutionReport, FinalConclusion, PatternType, StrategyAnalysis,
    StrategyOverride, StrategyPreview, StructureGraph, SubDebateResult,
};
pub use domain::ports::{AgentTurnProvider, DebateRunner, ExpertMatcher};
pub use domain::{DomainError, DomainResult};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{DebateOrchestrator, OrchestrationResult};
