//! End-to-end orchestration tests: strategy selection, phase execution, and
//! synthesis wired together.

mod common;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use agora::adapters::runners::{MockDebateRunner, MockOutcome};
use agora::domain::models::{PatternType, PhaseStatus, RankedOption, StrategyOverride, Truncation};
use agora::services::ExecutionEvent;

use common::{mock_orchestrator, simulated_orchestrator, test_config};

const OFFICE_QUESTION: &str = "¿Dónde abrir la nueva oficina: Madrid, Lisboa, Berlín o Varsovia?";

#[tokio::test]
async fn test_every_pattern_runs_end_to_end_on_simulated_turns() {
    let config = test_config();
    let orchestrator = simulated_orchestrator(&config);

    for pattern in PatternType::PRIORITY {
        let result = orchestrator
            .run_with_override(OFFICE_QUESTION, &StrategyOverride::pattern(pattern))
            .await
            .unwrap_or_else(|e| panic!("{pattern} failed: {e}"));

        let conclusion = &result.conclusion;
        assert_eq!(conclusion.pattern, pattern);
        assert!(conclusion.is_complete(), "{pattern}: {:?}", conclusion.status);
        assert!(conclusion.recommendation.is_some(), "{pattern} has no recommendation");
        assert!(conclusion.total_cost_usd > 0.0);
        assert!(conclusion.total_rounds >= 1);
        assert!((0.0..=1.0).contains(&conclusion.confidence));

        for (_, r) in result.report.all_results() {
            assert!(
                conclusion.accounts_for(&r.sub_debate_id),
                "{pattern}: {} is neither an input nor listed as unused",
                r.sub_debate_id
            );
        }
    }
}

#[tokio::test]
async fn test_options_question_runs_as_tournament() {
    let config = test_config();
    let result = simulated_orchestrator(&config).run(OFFICE_QUESTION).await.unwrap();

    assert_eq!(result.analysis.recommended_pattern, PatternType::Tournament);
    assert_eq!(result.report.status_of("round-1"), Some(PhaseStatus::Completed));
    assert_eq!(result.report.status_of("final"), Some(PhaseStatus::Completed));
    assert!(result.conclusion.inputs.iter().all(|i| i.phase_id == "final"));
    assert!(result
        .conclusion
        .not_used
        .iter()
        .any(|u| u.phase_id == "round-1"));
}

#[tokio::test]
async fn test_forced_experts_reach_the_runner() {
    let runner = Arc::new(MockDebateRunner::new());
    let orchestrator = mock_orchestrator(&runner, &test_config());
    let overrides = StrategyOverride::pattern(PatternType::Simple).with_experts(vec!["cfo".into()]);

    orchestrator.run_with_override("Hola equipo", &overrides).await.unwrap();

    let request = runner.request_for("main/1").unwrap();
    assert_eq!(request.forced_experts, Some(vec!["cfo".to_string()]));
}

#[tokio::test]
async fn test_cost_ceiling_yields_incomplete_conclusion() {
    let runner = Arc::new(MockDebateRunner::new().with_cost(0.5));
    let mut config = test_config();
    config.execution.max_cost_usd = Some(0.6);
    let orchestrator = mock_orchestrator(&runner, &config);

    let result = orchestrator
        .run_with_override("Hola equipo", &StrategyOverride::pattern(PatternType::Sequential))
        .await
        .unwrap();

    assert!(matches!(result.report.truncation, Some(Truncation::CostCeiling { .. })));
    assert_eq!(runner.calls_for("stage-3/1"), 0);
    assert_eq!(result.report.status_of("stage-3"), Some(PhaseStatus::Skipped));

    let conclusion = &result.conclusion;
    assert!(!conclusion.is_complete());
    assert!(conclusion.narrative.contains("INCOMPLETE"));
    assert!(conclusion.not_used.iter().any(|u| u.sub_debate_id == "stage-3/1"));
    assert!((conclusion.total_cost_usd - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_conditional_takes_then_branch_on_high_consensus() {
    let runner = Arc::new(MockDebateRunner::new());
    let orchestrator = mock_orchestrator(&runner, &test_config());

    let result = orchestrator
        .run_with_override("Hola equipo", &StrategyOverride::pattern(PatternType::Conditional))
        .await
        .unwrap();

    let decision = &result.report.branch_decisions[0];
    assert_eq!(decision.chosen_phase_id, "conclude");
    assert!(decision.condition_met);
    assert_eq!(result.report.status_of("deepen"), Some(PhaseStatus::Skipped));
    assert_eq!(runner.calls_for("deepen/1"), 0);
    assert!(result.conclusion.inputs.iter().all(|i| i.phase_id == "conclude"));
}

#[tokio::test]
async fn test_conditional_takes_else_branch_on_low_consensus() {
    let runner = Arc::new(MockDebateRunner::with_default_outcome(MockOutcome {
        consensus: 0.4,
        ..MockOutcome::default()
    }));
    let orchestrator = mock_orchestrator(&runner, &test_config());

    let result = orchestrator
        .run_with_override("Hola equipo", &StrategyOverride::pattern(PatternType::Conditional))
        .await
        .unwrap();

    let decision = &result.report.branch_decisions[0];
    assert_eq!(decision.chosen_phase_id, "deepen");
    assert!(!decision.condition_met);
    assert_eq!(runner.calls_for("deepen/1"), 1);
    assert_eq!(runner.calls_for("deepen/2"), 1);
    assert_eq!(runner.calls_for("conclude/1"), 0);
    assert!(result.conclusion.accounts_for("conclude/1"));
}

#[tokio::test]
async fn test_failed_sub_debate_is_reported_not_dropped() {
    let runner = Arc::new(MockDebateRunner::new().fail_always("round-1/1"));
    let orchestrator = mock_orchestrator(&runner, &test_config());

    let result = orchestrator.run(OFFICE_QUESTION).await.unwrap();

    assert_eq!(result.report.status_of("round-1"), Some(PhaseStatus::Completed));
    let unused = result
        .conclusion
        .not_used
        .iter()
        .find(|u| u.sub_debate_id == "round-1/1")
        .expect("failed sub-debate should be listed");
    assert!(!unused.reason.is_empty());
    assert!(result.conclusion.is_complete());
}

#[tokio::test]
async fn test_scripted_rankings_drive_recommendation() {
    let runner = Arc::new(MockDebateRunner::with_default_outcome(MockOutcome {
        ranking: vec![RankedOption::new("Lisboa", 0.9), RankedOption::new("Madrid", 0.4)],
        ..MockOutcome::default()
    }));
    let orchestrator = mock_orchestrator(&runner, &test_config());

    let result = orchestrator
        .run_with_override(OFFICE_QUESTION, &StrategyOverride::pattern(PatternType::Ensemble))
        .await
        .unwrap();

    assert_eq!(result.conclusion.recommendation.as_deref(), Some("Lisboa"));
    assert_eq!(result.conclusion.inputs.len(), 3);
}

#[tokio::test]
async fn test_run_streams_execution_events() {
    let runner = Arc::new(MockDebateRunner::new());
    let orchestrator = mock_orchestrator(&runner, &test_config());
    let (tx, mut rx) = mpsc::channel(256);

    orchestrator
        .run_with_events(
            "Hola equipo",
            &StrategyOverride::pattern(PatternType::Ensemble),
            tx,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(ExecutionEvent::Started { debate_count: 3, .. })));
    assert!(matches!(events.last(), Some(ExecutionEvent::Completed { truncated: false, .. })));
    let settled = events
        .iter()
        .filter(|e| matches!(e, ExecutionEvent::SubDebateCompleted { .. }))
        .count();
    assert_eq!(settled, 3);
}

#[test]
fn test_empty_question_fails_before_any_debate() {
    let runner = Arc::new(MockDebateRunner::new());
    let orchestrator = mock_orchestrator(&runner, &test_config());

    let result = tokio_test::block_on(orchestrator.run("  "));

    assert!(result.is_err());
    assert_eq!(runner.total_calls(), 0);
}

#[tokio::test]
async fn test_cancelled_run_does_not_affect_later_runs() {
    let runner = Arc::new(MockDebateRunner::new());
    let orchestrator = mock_orchestrator(&runner, &test_config());
    let overrides = StrategyOverride::pattern(PatternType::Ensemble);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (tx, _) = mpsc::channel(1);
    let cancelled = orchestrator
        .run_with_events("Hola equipo", &overrides, tx, cancel)
        .await
        .unwrap();
    assert_eq!(cancelled.report.truncation, Some(Truncation::Cancelled));
    assert!(!cancelled.conclusion.is_complete());
    assert_eq!(runner.total_calls(), 0);

    for _ in 0..2 {
        let result = orchestrator
            .run_with_override("Hola equipo", &overrides)
            .await
            .unwrap();
        assert_eq!(result.report.truncation, None);
        assert!(result.conclusion.is_complete());
        assert!(result
            .report
            .outcomes
            .iter()
            .all(|o| o.status == PhaseStatus::Completed));
    }
    assert_eq!(runner.total_calls(), 6);
}
