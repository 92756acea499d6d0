//! CLI command implementations.

pub mod analyze;
pub mod graph;
pub mod preview;
pub mod run;

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use crate::adapters::matchers::RosterMatcher;
use crate::adapters::turns::SimulatedTurnProvider;
use crate::domain::models::{AgentRole, Config, PhaseType, StrategyOverride};
use crate::services::orchestrator::DebateOrchestrator;
use crate::services::round_machine::RoundStateMachine;

/// Question plus manual overrides, shared by every command.
#[derive(Args, Debug, Clone)]
pub struct QuestionArgs {
    /// The question to debate
    pub question: String,

    /// Force a debate pattern (simple, sequential, parallel, tournament,
    /// adversarial, iterative, ensemble, hierarchical, conditional)
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Force the expert roster for every sub-debate (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub experts: Vec<String>,
}

impl QuestionArgs {
    /// Parse the pattern and expert flags into an override.
    pub fn overrides(&self) -> Result<StrategyOverride> {
        Ok(DebateOrchestrator::override_from_names(
            self.pattern.as_deref(),
            self.experts.clone(),
        )?)
    }
}

/// Orchestrator wired to the in-process round state machine with simulated
/// agent turns.
pub fn build_orchestrator(config: &Config) -> DebateOrchestrator {
    let base: Vec<AgentRole> = config
        .debate
        .default_roster
        .iter()
        .map(|r| AgentRole::from(r.as_str()))
        .collect();
    let matcher = if base.is_empty() {
        RosterMatcher::default()
    } else {
        RosterMatcher::new(base)
    }
    .with_common_experts();

    let runner = RoundStateMachine::new(Arc::new(SimulatedTurnProvider::new()), config)
        .with_matcher(Arc::new(matcher));
    DebateOrchestrator::new(Arc::new(runner), config)
}

pub(crate) const fn phase_kind(phase_type: PhaseType) -> &'static str {
    match phase_type {
        PhaseType::Debate => "debate",
        PhaseType::Branch => "branch",
        PhaseType::Synthesis => "synthesis",
    }
}
