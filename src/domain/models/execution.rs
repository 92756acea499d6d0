//! Runtime records produced by the phase executor.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::debate::{SubDebateResult, SubDebateStatus};
use super::structure::PhaseStatus;

/// Aggregate view of a phase's results. Branch conditions read from here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseAggregate {
    /// Mean consensus over completed sub-debates; `None` when none completed.
    pub consensus_score: Option<f64>,
    /// Spend summed over every result, failed ones included.
    pub cost_usd: f64,
    /// Sub-debates that completed.
    pub completed: usize,
    /// Sub-debates that failed after their last attempt.
    pub failed: usize,
    /// Rounds summed over every result.
    pub rounds: u32,
    /// Best-scoring top option among completed results.
    pub top_option: Option<String>,
    /// Score of `top_option`.
    pub top_score: Option<f64>,
}

impl PhaseAggregate {
    /// Aggregate the results of one phase.
    pub fn from_results(results: &[SubDebateResult]) -> Self {
        let completed: Vec<&SubDebateResult> = results.iter().filter(|r| r.is_completed()).collect();
        let consensus_score = if completed.is_empty() {
            None
        } else {
            Some(completed.iter().map(|r| r.consensus_score).sum::<f64>() / completed.len() as f64)
        };

        // Best-scoring top option among completed results.
        let best = completed
            .iter()
            .filter_map(|r| r.top_option())
            .fold(None::<(&str, f64)>, |acc, o| match acc {
                Some((_, s)) if s >= o.score => acc,
                _ => Some((o.option.as_str(), o.score)),
            });

        Self {
            consensus_score,
            cost_usd: results.iter().map(|r| r.cost_usd).sum(),
            completed: completed.len(),
            failed: results
                .iter()
                .filter(|r| r.status == SubDebateStatus::Failed)
                .count(),
            rounds: results.iter().map(|r| r.rounds).sum(),
            top_option: best.map(|(o, _)| o.to_string()),
            top_score: best.map(|(_, s)| s),
        }
    }

    /// Combine several aggregates (a branch with more than one dependency).
    pub fn combine(parts: &[&PhaseAggregate]) -> Self {
        let with_consensus: Vec<f64> = parts.iter().filter_map(|a| a.consensus_score).collect();
        let best = parts
            .iter()
            .filter_map(|a| a.top_option.as_ref().zip(a.top_score))
            .fold(None::<(&String, f64)>, |acc, (o, s)| match acc {
                Some((_, best)) if best >= s => acc,
                _ => Some((o, s)),
            });

        Self {
            consensus_score: if with_consensus.is_empty() {
                None
            } else {
                Some(with_consensus.iter().sum::<f64>() / with_consensus.len() as f64)
            },
            cost_usd: parts.iter().map(|a| a.cost_usd).sum(),
            completed: parts.iter().map(|a| a.completed).sum(),
            failed: parts.iter().map(|a| a.failed).sum(),
            rounds: parts.iter().map(|a| a.rounds).sum(),
            top_option: best.map(|(o, _)| o.clone()),
            top_score: best.map(|(_, s)| s),
        }
    }

    /// Numeric field lookup by name. `None` for unknown or absent fields.
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "consensus_score" | "consensusScore" => self.consensus_score,
            "cost_usd" | "costUsd" => Some(self.cost_usd),
            "completed" => Some(self.completed as f64),
            "failed" => Some(self.failed as f64),
            "rounds" => Some(f64::from(self.rounds)),
            "top_score" | "topScore" => self.top_score,
            _ => None,
        }
    }
}

/// Which way a branch went and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchDecision {
    /// The branch phase that decided.
    pub branch_phase_id: String,
    /// Phase moved to the front of the plan.
    pub chosen_phase_id: String,
    /// Phase marked skipped.
    pub skipped_phase_id: String,
    /// The value the condition compared, if it resolved.
    pub observed_value: Option<f64>,
    /// Whether the condition held; false also on fallback.
    pub condition_met: bool,
    /// Set when the field could not be resolved and the else branch was taken.
    pub fallback_reason: Option<String>,
}

/// Final record of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutcome {
    /// Phase this outcome records.
    pub phase_id: String,
    /// Terminal status.
    pub status: PhaseStatus,
    /// One result per sub-debate, in plan order.
    pub results: Vec<SubDebateResult>,
    /// Aggregate over `results`.
    pub aggregate: PhaseAggregate,
    /// Why the phase never ran.
    #[serde(default)]
    pub skip_reason: Option<String>,
    /// Decision taken, for branch phases.
    #[serde(default)]
    pub branch: Option<BranchDecision>,
}

impl PhaseOutcome {
    /// A phase that never ran.
    pub fn skipped(phase_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            phase_id: phase_id.into(),
            status: PhaseStatus::Skipped,
            results: Vec::new(),
            aggregate: PhaseAggregate::default(),
            skip_reason: Some(reason.into()),
            branch: None,
        }
    }
}

/// A phase status change, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    /// Phase whose status changed.
    pub phase_id: String,
    /// Status entered.
    pub status: PhaseStatus,
}

/// Why an execution stopped before reaching the end of its plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Truncation {
    CostCeiling { spent_usd: f64, limit_usd: f64 },
    TimeCeiling { elapsed_secs: f64, limit_secs: f64 },
    Cancelled,
}

impl std::fmt::Display for Truncation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CostCeiling { spent_usd, limit_usd } => {
                write!(f, "cost ceiling reached: spent {spent_usd:.2} of {limit_usd:.2} USD")
            }
            Self::TimeCeiling { elapsed_secs, limit_secs } => {
                write!(f, "time ceiling reached: {elapsed_secs:.0}s of {limit_secs:.0}s")
            }
            Self::Cancelled => write!(f, "execution cancelled"),
        }
    }
}

/// Everything the executor hands back. Outcomes are in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Phase outcomes in the order they finished.
    pub outcomes: Vec<PhaseOutcome>,
    /// Every status transition, in order.
    pub timeline: Vec<PhaseTransition>,
    /// Branch decisions in the order taken.
    pub branch_decisions: Vec<BranchDecision>,
    /// Spend over the whole run.
    pub total_cost_usd: f64,
    /// Wall-clock time of the run.
    pub elapsed: Duration,
    /// Set when a ceiling or cancellation stopped dispatch.
    pub truncation: Option<Truncation>,
}

impl ExecutionReport {
    /// Outcome of a phase by id.
    pub fn outcome(&self, phase_id: &str) -> Option<&PhaseOutcome> {
        self.outcomes.iter().find(|o| o.phase_id == phase_id)
    }

    /// Terminal status of a phase by id.
    pub fn status_of(&self, phase_id: &str) -> Option<PhaseStatus> {
        self.outcome(phase_id).map(|o| o.status)
    }

    /// Whether anything planned was left undispatched by a stop.
    pub fn is_truncated(&self) -> bool {
        self.truncation.is_some()
    }

    /// Every sub-debate result with the phase it belongs to.
    pub fn all_results(&self) -> impl Iterator<Item = (&PhaseOutcome, &SubDebateResult)> {
        self.outcomes
            .iter()
            .flat_map(|o| o.results.iter().map(move |r| (o, r)))
    }

    /// Rounds summed over every phase.
    pub fn total_rounds(&self) -> u32 {
        self.all_results().map(|(_, r)| r.rounds).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::debate::RankedOption;

    #[test]
    fn test_aggregate_ignores_failed_consensus() {
        let results = vec![
            SubDebateResult::completed("a", 0.8, vec![RankedOption::new("Mexico", 0.9)]).with_cost(0.1, 2),
            SubDebateResult::completed("b", 0.6, vec![RankedOption::new("Chile", 0.7)]).with_cost(0.1, 3),
            SubDebateResult::failed("c", "boom"),
        ];
        let agg = PhaseAggregate::from_results(&results);
        assert_eq!(agg.completed, 2);
        assert_eq!(agg.failed, 1);
        assert!((agg.consensus_score.unwrap() - 0.7).abs() < 1e-9);
        assert_eq!(agg.top_option.as_deref(), Some("Mexico"));
        assert_eq!(agg.rounds, 5);
    }

    #[test]
    fn test_missing_field_is_none() {
        let agg = PhaseAggregate::from_results(&[SubDebateResult::failed("a", "x")]);
        assert_eq!(agg.field("consensus_score"), None);
        assert_eq!(agg.field("sentiment"), None);
        assert_eq!(agg.field("failed"), Some(1.0));
    }
}
