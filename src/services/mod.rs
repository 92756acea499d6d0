//! Service layer: strategy selection, phase execution, debate rounds, and
//! synthesis.

pub mod convergence_controller;
pub mod cost_accumulator;
pub mod lexicon;
pub mod orchestrator;
pub mod pattern_scorer;
pub mod phase_executor;
pub mod quality_monitor;
pub mod result_synthesizer;
pub mod round_machine;
pub mod router_engine;
pub mod signal_detector;
pub mod strategy_selector;
pub mod structure_generator;

pub use convergence_controller::{ConvergenceController, ConvergenceDecision, RoundSnapshot};
pub use cost_accumulator::{CostAccumulator, CostDelta};
pub use orchestrator::{DebateOrchestrator, OrchestrationResult};
pub use pattern_scorer::{PatternRanking, PatternScorer};
pub use phase_executor::{ExecutionEvent, PhaseExecutor};
pub use quality_monitor::QualityMonitor;
pub use result_synthesizer::ResultSynthesizer;
pub use round_machine::RoundStateMachine;
pub use router_engine::{RouterAction, RouterCondition, RouterEngine, RouterRule};
pub use signal_detector::SignalDetector;
pub use strategy_selector::StrategySelector;
pub use structure_generator::StructureGenerator;
