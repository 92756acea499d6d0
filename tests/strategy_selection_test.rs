//! Strategy selection through the public orchestrator facade: signals in,
//! pattern and structure out, nothing executed.

mod common;

use std::sync::Arc;

use agora::adapters::runners::MockDebateRunner;
use agora::domain::models::{EdgeKind, NodeKind, PatternType, StrategyOverride};

use common::{mock_orchestrator, test_config};

#[test]
fn test_plain_question_is_a_single_simple_debate() {
    let runner = Arc::new(MockDebateRunner::new());
    let analysis = mock_orchestrator(&runner, &test_config())
        .analyze("Hola equipo")
        .unwrap();

    assert_eq!(analysis.recommended_pattern, PatternType::Simple);
    assert_eq!(analysis.structure.debate_count(), 1);
    assert!(analysis.signals.is_empty());
    assert!((analysis.confidence - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_binary_choice_prefers_adversarial() {
    let runner = Arc::new(MockDebateRunner::new());
    let analysis = mock_orchestrator(&runner, &test_config())
        .analyze("¿Debemos lanzar el plan premium o el plan básico?")
        .unwrap();

    assert_eq!(analysis.recommended_pattern, PatternType::Adversarial);
    assert!(analysis.structure.phase("arguments").is_some());
    assert!(analysis.structure.phase("judge").is_some());
    assert!(analysis.alternatives.contains(&PatternType::Simple));
}

#[test]
fn test_factors_shape_the_structure() {
    let runner = Arc::new(MockDebateRunner::new());
    let analysis = mock_orchestrator(&runner, &test_config())
        .analyze("¿Cuál es la mejor estrategia de crecimiento considerando costos, talento y regulación?")
        .unwrap();

    assert!(matches!(
        analysis.recommended_pattern,
        PatternType::Hierarchical | PatternType::Parallel
    ));
    for factor in ["costos", "talento", "regulación"] {
        assert!(
            analysis
                .structure
                .sub_debates()
                .any(|(_, d)| d.question.contains(factor)),
            "no sub-debate covers {factor}"
        );
    }
}

#[test]
fn test_estimates_scale_with_configured_cost() {
    let mut config = test_config();
    config.structure.cost_per_debate_usd = 1.0;
    config.structure.minutes_per_debate = 2.0;
    let runner = Arc::new(MockDebateRunner::new());

    let preview = mock_orchestrator(&runner, &config)
        .preview(
            "¿Dónde abrir la nueva oficina: Madrid, Lisboa, Berlín o Varsovia?",
            &StrategyOverride::default(),
        )
        .unwrap();

    assert_eq!(preview.pattern, PatternType::Tournament);
    assert_eq!(preview.phase_count, 2);
    assert_eq!(preview.debate_count, 3);
    assert!((preview.estimated_cost_usd - 3.0).abs() < 1e-9);
    // Round one runs in parallel: one slot for the pairings, one for the final.
    assert!((preview.estimated_time_minutes - 4.0).abs() < 1e-9);
    assert_eq!(runner.total_calls(), 0);
}

#[test]
fn test_graph_exposes_branch_edges() {
    let runner = Arc::new(MockDebateRunner::new());
    let orchestrator = mock_orchestrator(&runner, &test_config());
    let overrides = StrategyOverride::pattern(PatternType::Conditional);

    let graph = orchestrator.visualize("Hola equipo", &overrides).unwrap();

    let then_edge = graph.edges_of_kind(EdgeKind::BranchThen).next().unwrap();
    let else_edge = graph.edges_of_kind(EdgeKind::BranchElse).next().unwrap();
    assert_eq!((then_edge.from.as_str(), then_edge.to.as_str()), ("branch", "conclude"));
    assert_eq!((else_edge.from.as_str(), else_edge.to.as_str()), ("branch", "deepen"));
    assert_eq!(
        graph.nodes.iter().filter(|n| n.kind == NodeKind::Branch).count(),
        1
    );
    assert!(graph.nodes.iter().any(|n| n.kind == NodeKind::Synthesis));
}

#[test]
fn test_unknown_pattern_name_is_rejected() {
    let err = agora::DebateOrchestrator::override_from_names(Some("swiss"), Vec::new()).unwrap_err();
    assert!(err.to_string().contains("swiss"));
}

#[test]
fn test_analysis_serializes_with_snake_case_tags() {
    let runner = Arc::new(MockDebateRunner::new());
    let analysis = mock_orchestrator(&runner, &test_config())
        .analyze_with_override(
            "Hola equipo",
            &StrategyOverride::pattern(PatternType::Hierarchical),
        )
        .unwrap();

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["recommended_pattern"], "hierarchical");
    assert_eq!(json["forced"], true);
    assert_eq!(json["structure"]["phases"][0]["id"], "overview");
}
