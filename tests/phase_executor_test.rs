//! Phase executor integration tests over hand-built structures, with both the
//! mock runner and the round state machine.

mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agora::adapters::runners::MockDebateRunner;
use agora::adapters::turns::SimulatedTurnProvider;
use agora::domain::models::{
    DebateStructure, ExecutionConfig, ExecutionMode, PatternType, Phase, PhaseStatus, SubDebate,
    SubDebateStatus, Truncation,
};
use agora::domain::ports::{AgentTurn, AgentTurnProvider, TurnRequest};
use agora::services::{PhaseExecutor, RoundStateMachine};
use agora::{DomainError, DomainResult};

use common::test_config;

fn debate(id: &str) -> SubDebate {
    SubDebate::new(id, format!("¿Opción A u opción B para {id}?"))
}

/// a -> (b, c) -> d
fn diamond() -> DebateStructure {
    let mut s = DebateStructure::new(PatternType::Hierarchical, "q");
    s.push_phase(Phase::debate("a", "a", ExecutionMode::Sequential).with_debate(debate("a/1")));
    s.push_phase(
        Phase::debate("b", "b", ExecutionMode::Sequential)
            .depends_on(["a"])
            .with_debate(debate("b/1").inheriting()),
    );
    s.push_phase(
        Phase::debate("c", "c", ExecutionMode::Sequential)
            .depends_on(["a"])
            .with_debate(debate("c/1").inheriting()),
    );
    s.push_phase(
        Phase::debate("d", "d", ExecutionMode::Sequential)
            .depends_on(["b", "c"])
            .with_debate(debate("d/1").inheriting()),
    );
    s
}

fn quick_config() -> ExecutionConfig {
    test_config().execution
}

/// Turn provider that fails a fixed number of turns for one sub-debate, then
/// defers to the simulated provider.
struct FlakyTurns {
    inner: SimulatedTurnProvider,
    target: String,
    remaining_failures: AtomicUsize,
    seen: Mutex<HashSet<String>>,
}

impl FlakyTurns {
    fn new(target: &str, failures: usize) -> Self {
        Self {
            inner: SimulatedTurnProvider::new(),
            target: target.to_string(),
            remaining_failures: AtomicUsize::new(failures),
            seen: Mutex::new(HashSet::new()),
        }
    }
}

#[async_trait]
impl AgentTurnProvider for FlakyTurns {
    async fn take_turn(&self, request: TurnRequest) -> DomainResult<AgentTurn> {
        self.seen.lock().unwrap().insert(request.sub_debate_id.clone());
        if request.sub_debate_id == self.target
            && self
                .remaining_failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(DomainError::provider(&request.sub_debate_id, "rate limited"));
        }
        self.inner.take_turn(request).await
    }
}

#[tokio::test]
async fn test_diamond_joins_both_branches() {
    let runner = Arc::new(MockDebateRunner::new());
    let executor = PhaseExecutor::new(runner.clone(), quick_config());

    let report = executor.execute(&diamond()).await.unwrap();

    let order: Vec<&str> = report.outcomes.iter().map(|o| o.phase_id.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c", "d"]);
    assert!(report.outcomes.iter().all(|o| o.status == PhaseStatus::Completed));

    let sources: Vec<String> = runner
        .request_for("d/1")
        .unwrap()
        .context
        .prior_conclusions
        .iter()
        .map(|c| c.source_id.clone())
        .collect();
    assert_eq!(sources, vec!["b/1".to_string(), "c/1".to_string()]);
}

#[tokio::test]
async fn test_failed_branch_skips_join() {
    let runner = Arc::new(MockDebateRunner::new().fail_always("c/1"));
    let executor = PhaseExecutor::new(runner.clone(), quick_config());

    let report = executor.execute(&diamond()).await.unwrap();

    assert_eq!(report.status_of("b"), Some(PhaseStatus::Completed));
    assert_eq!(report.status_of("c"), Some(PhaseStatus::Failed));
    assert_eq!(report.status_of("d"), Some(PhaseStatus::Skipped));
    assert_eq!(runner.calls_for("d/1"), 0);
    assert_eq!(
        report.outcome("d").unwrap().results[0].status,
        SubDebateStatus::Skipped
    );
}

#[tokio::test]
async fn test_zero_time_ceiling_dispatches_nothing() {
    let runner = Arc::new(MockDebateRunner::new());
    let config = ExecutionConfig {
        max_duration_secs: Some(0),
        ..quick_config()
    };
    let executor = PhaseExecutor::new(runner.clone(), config);

    let report = executor.execute(&diamond()).await.unwrap();

    assert_eq!(runner.total_calls(), 0);
    assert!(matches!(report.truncation, Some(Truncation::TimeCeiling { .. })));
    assert!(report.outcomes.iter().all(|o| o.status == PhaseStatus::Skipped));
    assert_eq!(report.all_results().count(), 4);
}

#[tokio::test]
async fn test_round_machine_recovers_through_executor_retry() {
    let config = test_config();
    let turns = Arc::new(FlakyTurns::new("b/1", 1));
    let runner = RoundStateMachine::new(turns.clone(), &config);
    let executor = PhaseExecutor::new(Arc::new(runner), config.execution.clone());

    let report = executor.execute(&diamond()).await.unwrap();

    assert_eq!(report.status_of("b"), Some(PhaseStatus::Completed));
    assert_eq!(report.status_of("d"), Some(PhaseStatus::Completed));
    let b = &report.outcome("b").unwrap().results[0];
    assert!(b.is_completed());
    assert!(b.rounds >= 1);
    assert!(!b.transcript.is_empty());
}

#[tokio::test]
async fn test_round_machine_exhausted_retries_fail_the_phase() {
    let config = test_config();
    let turns = Arc::new(FlakyTurns::new("a/1", 100));
    let runner = RoundStateMachine::new(turns.clone(), &config);
    let executor = PhaseExecutor::new(Arc::new(runner), config.execution.clone());

    let report = executor.execute(&diamond()).await.unwrap();

    assert_eq!(report.status_of("a"), Some(PhaseStatus::Failed));
    let a = &report.outcome("a").unwrap().results[0];
    assert_eq!(a.status, SubDebateStatus::Failed);
    assert!(a.error.as_deref().unwrap().contains("rate limited"));
    for phase in ["b", "c", "d"] {
        assert_eq!(report.status_of(phase), Some(PhaseStatus::Skipped));
    }
    assert!(!turns.seen.lock().unwrap().contains("b/1"));
}

#[tokio::test]
async fn test_parallel_results_keep_plan_order() {
    let mut s = DebateStructure::new(PatternType::Parallel, "q");
    let mut phase = Phase::debate("dimensions", "dimensions", ExecutionMode::Parallel);
    for i in 1..=5 {
        phase = phase.with_debate(debate(&format!("dimensions/{i}")));
    }
    s.push_phase(phase);

    let runner = Arc::new(MockDebateRunner::new().fail_always("dimensions/3"));
    let report = PhaseExecutor::new(runner, quick_config())
        .execute(&s)
        .await
        .unwrap();

    let ids: Vec<&str> = report.outcomes[0]
        .results
        .iter()
        .map(|r| r.sub_debate_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["dimensions/1", "dimensions/2", "dimensions/3", "dimensions/4", "dimensions/5"]
    );
    assert!((report.total_cost_usd - 0.2).abs() < 1e-9);
}
