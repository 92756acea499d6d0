//! Result synthesizer: folds an execution report into a final conclusion.
//!
//! Each pattern names its decisive phases. Completed results in those phases
//! feed the final ranking; every other result is recorded in `not_used` with
//! the reason, so nothing that ran is dropped.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::models::{
    ConclusionInput, ConclusionStatus, DebateStructure, ExecutionReport, FinalConclusion,
    PatternType, PhaseOutcome, RankedOption, SubDebateResult, SubDebateStatus,
    SupportingEvidence, UnusedResult,
};

/// Lower bound on a result's weight so a low-consensus input still counts.
const MIN_INPUT_WEIGHT: f64 = 0.1;

/// Confidence multiplier when the decisive phases produced nothing and every
/// completed result was merged instead.
const FALLBACK_CONFIDENCE_FACTOR: f64 = 0.5;

/// Which phases decide the final ranking, and how the rest are labelled.
struct Plan {
    decisive: Vec<String>,
    /// Phases whose completed results become supporting evidence.
    evidence: Vec<String>,
    unused_reason: String,
}

/// Merges phase outcomes into a final conclusion.
#[derive(Debug, Clone, Default)]
pub struct ResultSynthesizer;

impl ResultSynthesizer {
    /// A synthesizer.
    pub fn new() -> Self {
        Self
    }

    /// Build the conclusion for a finished or truncated run.
    pub fn synthesize(&self, structure: &DebateStructure, report: &ExecutionReport) -> FinalConclusion {
        let plan = decisive_plan(structure, report);
        debug!(pattern = %structure.pattern, decisive = ?plan.decisive, "Resolved decisive phases");

        let mut selected: Vec<(&PhaseOutcome, &SubDebateResult)> = report
            .all_results()
            .filter(|(o, r)| r.is_completed() && plan.decisive.contains(&o.phase_id))
            .collect();

        let fallback = selected.is_empty();
        if fallback {
            selected = report.all_results().filter(|(_, r)| r.is_completed()).collect();
        }

        let inputs: Vec<ConclusionInput> = selected
            .iter()
            .map(|(o, r)| ConclusionInput {
                sub_debate_id: r.sub_debate_id.clone(),
                phase_id: o.phase_id.clone(),
                weight: weight_of(r),
            })
            .collect();

        let not_used: Vec<UnusedResult> = report
            .all_results()
            .filter(|(_, r)| !inputs.iter().any(|i| i.sub_debate_id == r.sub_debate_id))
            .map(|(o, r)| UnusedResult {
                sub_debate_id: r.sub_debate_id.clone(),
                phase_id: o.phase_id.clone(),
                reason: unused_reason(o, r, &plan),
            })
            .collect();

        let evidence: Vec<SupportingEvidence> = report
            .all_results()
            .filter(|(o, r)| r.is_completed() && plan.evidence.contains(&o.phase_id))
            .map(|(o, r)| SupportingEvidence {
                sub_debate_id: r.sub_debate_id.clone(),
                stance: stance_of(structure.pattern, o, r),
                summary: r.summary.clone(),
                top_option: r.top_option().map(|t| t.option.clone()),
            })
            .collect();

        let ranking = merge_rankings(&selected);
        let mut confidence = weighted_consensus(&selected);
        if fallback && !selected.is_empty() {
            confidence *= FALLBACK_CONFIDENCE_FACTOR;
        }

        let status = match (&report.truncation, selected.is_empty()) {
            (Some(truncation), _) => ConclusionStatus::Incomplete {
                reason: truncation.to_string(),
            },
            (None, true) => ConclusionStatus::Incomplete {
                reason: "no sub-debate completed".to_string(),
            },
            (None, false) => ConclusionStatus::Complete,
        };

        let recommendation = ranking.first().map(|o| o.option.clone());
        let narrative = narrate(structure, report, &status, &ranking, confidence, fallback);

        info!(
            pattern = %structure.pattern,
            inputs = inputs.len(),
            not_used = not_used.len(),
            complete = matches!(status, ConclusionStatus::Complete),
            recommendation = recommendation.as_deref().unwrap_or("-"),
            "Synthesized final conclusion"
        );

        FinalConclusion {
            id: Uuid::new_v4(),
            question: structure.question.clone(),
            pattern: structure.pattern,
            status,
            recommendation,
            ranking,
            confidence: confidence.clamp(0.0, 1.0),
            narrative,
            inputs,
            not_used,
            evidence,
            total_cost_usd: report.total_cost_usd,
            total_rounds: report.total_rounds(),
            created_at: Utc::now(),
        }
    }
}

fn decisive_plan(structure: &DebateStructure, report: &ExecutionReport) -> Plan {
    let ids = |ids: &[&str]| ids.iter().map(|s| (*s).to_string()).collect::<Vec<_>>();
    let has_completed = |phase_id: &str| {
        report
            .outcome(phase_id)
            .is_some_and(|o| o.results.iter().any(SubDebateResult::is_completed))
    };

    match structure.pattern {
        PatternType::Tournament if has_completed("final") => Plan {
            decisive: ids(&["final"]),
            evidence: ids(&["round-1"]),
            unused_reason: "superseded by the final phase".into(),
        },
        PatternType::Tournament => Plan {
            decisive: ids(&["round-1"]),
            evidence: Vec::new(),
            unused_reason: "not part of the tournament result".into(),
        },
        PatternType::Adversarial => Plan {
            decisive: ids(&["judge"]),
            evidence: ids(&["arguments"]),
            unused_reason: "argument carried as supporting evidence for the judge".into(),
        },
        PatternType::Ensemble | PatternType::Parallel | PatternType::Hierarchical => Plan {
            decisive: structure.phases.iter().map(|p| p.id.clone()).collect(),
            evidence: Vec::new(),
            unused_reason: "not merged".into(),
        },
        PatternType::Sequential | PatternType::Iterative => {
            let last = report
                .outcomes
                .iter()
                .rev()
                .find(|o| o.results.iter().any(SubDebateResult::is_completed))
                .map(|o| o.phase_id.clone());
            Plan {
                unused_reason: match &last {
                    Some(id) => format!("fed forward as context into phase '{id}'"),
                    None => "no stage completed".into(),
                },
                decisive: last.into_iter().collect(),
                evidence: Vec::new(),
            }
        }
        PatternType::Conditional => {
            let chosen: Vec<String> = report
                .branch_decisions
                .iter()
                .map(|d| d.chosen_phase_id.clone())
                .collect();
            let explored: Vec<String> = structure
                .phases
                .iter()
                .filter(|p| !p.is_branch() && !chosen.contains(&p.id))
                .filter(|p| report.branch_decisions.iter().all(|d| d.skipped_phase_id != p.id))
                .map(|p| p.id.clone())
                .collect();
            Plan {
                decisive: chosen,
                evidence: explored,
                unused_reason: "exploration that informed the branch decision".into(),
            }
        }
        PatternType::Simple => Plan {
            decisive: ids(&["main"]),
            evidence: Vec::new(),
            unused_reason: "outside the main phase".into(),
        },
    }
}

fn weight_of(result: &SubDebateResult) -> f64 {
    result.consensus_score.max(MIN_INPUT_WEIGHT)
}

fn unused_reason(outcome: &PhaseOutcome, result: &SubDebateResult, plan: &Plan) -> String {
    let detail = result.error.as_deref().unwrap_or("no reason recorded");
    match result.status {
        SubDebateStatus::Failed => format!("failed: {detail}"),
        SubDebateStatus::Skipped => {
            let why = outcome.skip_reason.as_deref().unwrap_or(detail);
            format!("skipped: {why}")
        }
        SubDebateStatus::Completed => plan.unused_reason.clone(),
    }
}

fn stance_of(pattern: PatternType, outcome: &PhaseOutcome, result: &SubDebateResult) -> String {
    match pattern {
        PatternType::Adversarial => result
            .sub_debate_id
            .rsplit('/')
            .next()
            .unwrap_or(&result.sub_debate_id)
            .to_string(),
        _ => outcome.phase_id.clone(),
    }
}

/// Weighted average of option scores. An input that did not rank an option
/// contributes zero for it. Ties keep first-seen order.
fn merge_rankings(selected: &[(&PhaseOutcome, &SubDebateResult)]) -> Vec<RankedOption> {
    let total_weight: f64 = selected.iter().map(|(_, r)| weight_of(r)).sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    let mut order: Vec<String> = Vec::new();
    let mut sums: HashMap<String, f64> = HashMap::new();
    for (_, result) in selected {
        let weight = weight_of(result);
        for option in &result.ranking {
            if !sums.contains_key(&option.option) {
                order.push(option.option.clone());
            }
            *sums.entry(option.option.clone()).or_default() += weight * option.score;
        }
    }

    let mut ranking: Vec<RankedOption> = order
        .into_iter()
        .map(|option| {
            let score = sums.get(&option).copied().unwrap_or_default() / total_weight;
            RankedOption::new(option, score)
        })
        .collect();
    ranking.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranking
}

fn weighted_consensus(selected: &[(&PhaseOutcome, &SubDebateResult)]) -> f64 {
    let total_weight: f64 = selected.iter().map(|(_, r)| weight_of(r)).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }
    selected
        .iter()
        .map(|(_, r)| weight_of(r) * r.consensus_score)
        .sum::<f64>()
        / total_weight
}

fn narrate(
    structure: &DebateStructure,
    report: &ExecutionReport,
    status: &ConclusionStatus,
    ranking: &[RankedOption],
    confidence: f64,
    fallback: bool,
) -> String {
    let count = |status: SubDebateStatus| report.all_results().filter(|(_, r)| r.status == status).count();
    let mut lines = vec![format!(
        "{} debate over {} sub-debates: {} completed, {} failed, {} skipped.",
        structure.pattern,
        structure.debate_count(),
        count(SubDebateStatus::Completed),
        count(SubDebateStatus::Failed),
        count(SubDebateStatus::Skipped),
    )];

    match ranking.first() {
        Some(top) => lines.push(format!(
            "Recommendation: {} (score {:.2}, confidence {:.2}).",
            top.option, top.score, confidence
        )),
        None => lines.push("No ranked recommendation.".to_string()),
    }
    if ranking.len() > 1 {
        let rest: Vec<String> = ranking[1..]
            .iter()
            .map(|o| format!("{} ({:.2})", o.option, o.score))
            .collect();
        lines.push(format!("Then: {}.", rest.join(", ")));
    }
    if fallback && !ranking.is_empty() {
        lines.push("Decisive phase produced no result; merged every completed sub-debate.".into());
    }
    if let ConclusionStatus::Incomplete { reason } = status {
        lines.push(format!("INCOMPLETE: {reason}."));
    }
    lines.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{
        ExecutionMode, Phase, PhaseAggregate, PhaseStatus, SubDebate, Truncation,
    };

    fn outcome(phase_id: &str, results: Vec<SubDebateResult>) -> PhaseOutcome {
        let aggregate = PhaseAggregate::from_results(&results);
        PhaseOutcome {
            phase_id: phase_id.into(),
            status: if aggregate.completed > 0 {
                PhaseStatus::Completed
            } else {
                PhaseStatus::Failed
            },
            results,
            aggregate,
            skip_reason: None,
            branch: None,
        }
    }

    fn ranked(id: &str, consensus: f64, options: &[(&str, f64)]) -> SubDebateResult {
        SubDebateResult::completed(
            id,
            consensus,
            options.iter().map(|(o, s)| RankedOption::new(*o, *s)).collect(),
        )
        .with_cost(0.1, 2)
        .with_summary(format!("summary of {id}"))
    }

    fn structure(pattern: PatternType, phases: &[(&str, &[&str])]) -> DebateStructure {
        let mut s = DebateStructure::new(pattern, "q");
        for (id, debates) in phases {
            let mut phase = Phase::debate(*id, *id, ExecutionMode::Parallel);
            for d in *debates {
                phase = phase.with_debate(SubDebate::new(*d, "q"));
            }
            s.push_phase(phase);
        }
        s
    }

    #[test]
    fn test_failed_result_is_recorded_not_dropped() {
        let s = structure(PatternType::Ensemble, &[("perspectives", &["p/a", "p/b", "p/c"])]);
        let report = ExecutionReport {
            outcomes: vec![outcome(
                "perspectives",
                vec![
                    ranked("p/a", 0.8, &[("Mexico", 0.9), ("Chile", 0.4)]),
                    ranked("p/b", 0.6, &[("Chile", 0.8), ("Mexico", 0.5)]),
                    SubDebateResult::failed("p/c", "upstream timeout"),
                ],
            )],
            total_cost_usd: 0.2,
            ..Default::default()
        };

        let conclusion = ResultSynthesizer::new().synthesize(&s, &report);
        assert_eq!(conclusion.inputs.len(), 2);
        assert_eq!(conclusion.not_used.len(), 1);
        assert_eq!(conclusion.not_used[0].sub_debate_id, "p/c");
        assert!(conclusion.not_used[0].reason.contains("upstream timeout"));
        assert!(conclusion.is_complete());
        assert_eq!(conclusion.recommendation.as_deref(), Some("Mexico"));
    }

    #[test]
    fn test_tournament_takes_final_winner() {
        let s = structure(
            PatternType::Tournament,
            &[("round-1", &["round-1/1", "round-1/2"]), ("final", &["final/1"])],
        );
        let report = ExecutionReport {
            outcomes: vec![
                outcome(
                    "round-1",
                    vec![
                        ranked("round-1/1", 0.9, &[("A", 0.9), ("B", 0.1)]),
                        ranked("round-1/2", 0.9, &[("C", 0.9), ("D", 0.1)]),
                    ],
                ),
                outcome("final", vec![ranked("final/1", 0.7, &[("C", 0.8), ("A", 0.6)])]),
            ],
            ..Default::default()
        };

        let conclusion = ResultSynthesizer::new().synthesize(&s, &report);
        assert_eq!(conclusion.recommendation.as_deref(), Some("C"));
        assert_eq!(conclusion.inputs.len(), 1);
        assert_eq!(conclusion.evidence.len(), 2);
        assert!(conclusion.accounts_for("round-1/1"));
        assert!(conclusion.accounts_for("round-1/2"));
    }

    #[test]
    fn test_adversarial_carries_both_sides() {
        let s = structure(
            PatternType::Adversarial,
            &[
                ("arguments", &["arguments/defender", "arguments/attacker"]),
                ("judge", &["judge/1"]),
            ],
        );
        let report = ExecutionReport {
            outcomes: vec![
                outcome(
                    "arguments",
                    vec![
                        ranked("arguments/defender", 0.8, &[("go", 0.9)]),
                        ranked("arguments/attacker", 0.8, &[("stop", 0.9)]),
                    ],
                ),
                outcome("judge", vec![ranked("judge/1", 0.75, &[("go", 0.7), ("stop", 0.3)])]),
            ],
            ..Default::default()
        };

        let conclusion = ResultSynthesizer::new().synthesize(&s, &report);
        assert_eq!(conclusion.recommendation.as_deref(), Some("go"));
        let stances: Vec<&str> = conclusion.evidence.iter().map(|e| e.stance.as_str()).collect();
        assert_eq!(stances, vec!["defender", "attacker"]);
    }

    #[test]
    fn test_fallback_merges_everything_with_lower_confidence() {
        let s = structure(PatternType::Adversarial, &[("arguments", &["a/defender"]), ("judge", &["judge/1"])]);
        let report = ExecutionReport {
            outcomes: vec![
                outcome("arguments", vec![ranked("a/defender", 0.8, &[("go", 0.9)])]),
                outcome("judge", vec![SubDebateResult::failed("judge/1", "boom")]),
            ],
            ..Default::default()
        };

        let conclusion = ResultSynthesizer::new().synthesize(&s, &report);
        assert_eq!(conclusion.inputs.len(), 1);
        assert!((conclusion.confidence - 0.4).abs() < 1e-9);
        assert!(conclusion.narrative.contains("merged every completed"));
    }

    #[test]
    fn test_truncated_report_is_incomplete() {
        let s = structure(PatternType::Simple, &[("main", &["main/1"])]);
        let report = ExecutionReport {
            outcomes: vec![outcome("main", vec![ranked("main/1", 0.9, &[("yes", 1.0)])])],
            truncation: Some(Truncation::CostCeiling {
                spent_usd: 1.2,
                limit_usd: 1.0,
            }),
            ..Default::default()
        };
        let conclusion = ResultSynthesizer::new().synthesize(&s, &report);
        assert!(!conclusion.is_complete());
        assert!(conclusion.narrative.contains("INCOMPLETE"));
    }

    #[test]
    fn test_nothing_completed_is_incomplete() {
        let s = structure(PatternType::Simple, &[("main", &["main/1"])]);
        let report = ExecutionReport {
            outcomes: vec![outcome("main", vec![SubDebateResult::failed("main/1", "boom")])],
            ..Default::default()
        };
        let conclusion = ResultSynthesizer::new().synthesize(&s, &report);
        assert!(matches!(conclusion.status, ConclusionStatus::Incomplete { .. }));
        assert!(conclusion.recommendation.is_none());
        assert_eq!(conclusion.confidence, 0.0);
    }

    #[test]
    fn test_merge_weights_by_consensus() {
        let high = ranked("a", 0.9, &[("X", 1.0)]);
        let low = ranked("b", 0.1, &[("Y", 1.0)]);
        let o = outcome("p", vec![]);
        let merged = merge_rankings(&[(&o, &high), (&o, &low)]);
        assert_eq!(merged[0].option, "X");
        assert!((merged[0].score - 0.9).abs() < 1e-9);
        assert!((merged[1].score - 0.1).abs() < 1e-9);
    }
}
