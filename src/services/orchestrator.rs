//! Public facade over strategy selection, execution, and synthesis.
//!
//! The orchestrator is stateless between invocations: analyses, reports, and
//! conclusions are handed back for the caller to persist.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Config, ExecutionReport, FinalConclusion, PatternType, StrategyAnalysis, StrategyOverride,
    StrategyPreview, StructureGraph,
};
use crate::domain::ports::DebateRunner;
use crate::services::phase_executor::{ExecutionEvent, PhaseExecutor};
use crate::services::result_synthesizer::ResultSynthesizer;
use crate::services::strategy_selector::StrategySelector;

/// Everything one orchestration produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Chosen pattern and plan.
    pub analysis: StrategyAnalysis,
    /// What ran and what it cost.
    pub report: ExecutionReport,
    /// Synthesized answer.
    pub conclusion: FinalConclusion,
}

/// Entry point: analyze, preview, visualize and run questions.
pub struct DebateOrchestrator {
    selector: StrategySelector,
    executor: PhaseExecutor,
    synthesizer: ResultSynthesizer,
}

impl DebateOrchestrator {
    /// Wire the selector, executor and synthesizer from `config`.
    pub fn new(runner: Arc<dyn DebateRunner>, config: &Config) -> Self {
        Self {
            selector: StrategySelector::new(config.structure.clone()),
            executor: PhaseExecutor::new(runner, config.execution.clone()),
            synthesizer: ResultSynthesizer::new(),
        }
    }

    /// Build an override from a pattern name and an expert list, as given on
    /// a command line or an API call.
    pub fn override_from_names(
        pattern: Option<&str>,
        experts: Vec<String>,
    ) -> DomainResult<StrategyOverride> {
        let pattern = pattern.map(str::parse::<PatternType>).transpose()?;
        let experts: Vec<String> = experts
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Ok(StrategyOverride {
            pattern,
            experts: (!experts.is_empty()).then_some(experts),
        })
    }

    /// Pick a pattern and build its structure.
    pub fn analyze(&self, question: &str) -> DomainResult<StrategyAnalysis> {
        self.selector.analyze(question)
    }

    /// Like [`Self::analyze`], honouring a forced pattern or roster.
    pub fn analyze_with_override(
        &self,
        question: &str,
        overrides: &StrategyOverride,
    ) -> DomainResult<StrategyAnalysis> {
        self.selector.analyze_with_override(question, overrides)
    }

    /// Counts and estimates without executing anything.
    pub fn preview(&self, question: &str, overrides: &StrategyOverride) -> DomainResult<StrategyPreview> {
        Ok(self.analyze_with_override(question, overrides)?.preview())
    }

    /// Graph form of the planned structure for external rendering.
    pub fn visualize(&self, question: &str, overrides: &StrategyOverride) -> DomainResult<StructureGraph> {
        let analysis = self.analyze_with_override(question, overrides)?;
        Ok(StructureGraph::from_structure(&analysis.structure))
    }

    /// Analyze, execute and synthesize.
    pub async fn run(&self, question: &str) -> DomainResult<OrchestrationResult> {
        self.run_with_override(question, &StrategyOverride::default())
            .await
    }

    /// Like [`Self::run`], honouring a manual override.
    pub async fn run_with_override(
        &self,
        question: &str,
        overrides: &StrategyOverride,
    ) -> DomainResult<OrchestrationResult> {
        let (tx, _) = mpsc::channel(1);
        self.run_with_events(question, overrides, tx, CancellationToken::new())
            .await
    }

    /// Analyze, execute, and synthesize, streaming executor events.
    ///
    /// Cancelling `cancel` stops dispatching new work in this run; the
    /// conclusion is synthesized from whatever finished.
    #[instrument(skip(self, overrides, event_tx, cancel), fields(question = %question))]
    pub async fn run_with_events(
        &self,
        question: &str,
        overrides: &StrategyOverride,
        event_tx: mpsc::Sender<ExecutionEvent>,
        cancel: CancellationToken,
    ) -> DomainResult<OrchestrationResult> {
        let analysis = self.analyze_with_override(question, overrides)?;
        info!(
            pattern = %analysis.recommended_pattern,
            confidence = analysis.confidence,
            forced = analysis.forced,
            estimated_cost_usd = analysis.estimated_cost_usd,
            "Strategy selected"
        );

        let report = self
            .executor
            .execute_with_events(&analysis.structure, event_tx, cancel)
            .await?;
        let conclusion = self.synthesizer.synthesize(&analysis.structure, &report);

        Ok(OrchestrationResult {
            analysis,
            report,
            conclusion,
        })
    }
}
