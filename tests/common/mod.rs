//! Common test utilities for integration tests
//!
//! Shared fixtures for building configurations and orchestrators over the
//! mock runner or the in-process round state machine.

use std::sync::Arc;

use agora::adapters::matchers::RosterMatcher;
use agora::adapters::runners::MockDebateRunner;
use agora::adapters::turns::SimulatedTurnProvider;
use agora::services::{DebateOrchestrator, RoundStateMachine};
use agora::{Config, DebateRunner};

/// Default configuration with retries that do not sleep.
#[allow(dead_code)]
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.execution.retry_delay_ms = 0;
    config
}

/// Orchestrator over a shared mock runner, so tests can inspect calls.
#[allow(dead_code)]
pub fn mock_orchestrator(runner: &Arc<MockDebateRunner>, config: &Config) -> DebateOrchestrator {
    let runner: Arc<dyn DebateRunner> = Arc::<MockDebateRunner>::clone(runner);
    DebateOrchestrator::new(runner, config)
}

/// Orchestrator over the real round state machine with simulated turns.
#[allow(dead_code)]
pub fn simulated_orchestrator(config: &Config) -> DebateOrchestrator {
    let runner = RoundStateMachine::new(Arc::new(SimulatedTurnProvider::new()), config)
        .with_matcher(Arc::new(RosterMatcher::default().with_common_experts()));
    DebateOrchestrator::new(Arc::new(runner), config)
}

/// Setup test logging
///
/// Call at the start of tests whose tracing output helps when they fail.
#[allow(dead_code)]
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
