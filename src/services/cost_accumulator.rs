//! Orchestration-wide cost and time accumulator.
//!
//! The only cross-phase mutable state of an execution. Parallel sub-debates
//! never touch it: they return [`CostDelta`]s which the executor folds in once
//! after fan-in. `fold_in` takes `&mut self`, so there is exactly one writer.

use std::time::{Duration, Instant};

use crate::domain::models::{ExecutionConfig, SubDebateResult, Truncation};

/// Spend reported by one settled sub-debate.
#[derive(Debug, Clone, PartialEq)]
pub struct CostDelta {
    /// Settled sub-debate.
    pub sub_debate_id: String,
    /// Its spend.
    pub cost_usd: f64,
    /// Its rounds.
    pub rounds: u32,
}

impl CostDelta {
    /// The delta a result contributes.
    pub fn from_result(result: &SubDebateResult) -> Self {
        Self {
            sub_debate_id: result.sub_debate_id.clone(),
            cost_usd: result.cost_usd,
            rounds: result.rounds,
        }
    }
}

/// Single-writer running totals for one execution, checked against its ceilings.
#[derive(Debug, Clone)]
pub struct CostAccumulator {
    total_cost_usd: f64,
    total_rounds: u32,
    settled: usize,
    started: Instant,
    max_cost_usd: Option<f64>,
    max_duration: Option<Duration>,
}

impl CostAccumulator {
    /// Start the clock with the configured ceilings.
    pub fn new(config: &ExecutionConfig) -> Self {
        Self {
            total_cost_usd: 0.0,
            total_rounds: 0,
            settled: 0,
            started: Instant::now(),
            max_cost_usd: config.max_cost_usd,
            max_duration: config.max_duration_secs.map(Duration::from_secs),
        }
    }

    /// Apply the deltas of one fan-in.
    pub fn fold_in(&mut self, deltas: impl IntoIterator<Item = CostDelta>) {
        for delta in deltas {
            self.total_cost_usd += delta.cost_usd;
            self.total_rounds += delta.rounds;
            self.settled += 1;
        }
    }

    /// Spend so far.
    pub fn total_cost_usd(&self) -> f64 {
        self.total_cost_usd
    }

    /// Rounds so far.
    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    /// Sub-debates folded in so far.
    pub fn settled(&self) -> usize {
        self.settled
    }

    /// Time since the accumulator was created.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// The ceiling that blocks further dispatch, if any.
    pub fn breached_ceiling(&self) -> Option<Truncation> {
        if let Some(limit) = self.max_cost_usd {
            if self.total_cost_usd >= limit {
                return Some(Truncation::CostCeiling {
                    spent_usd: self.total_cost_usd,
                    limit_usd: limit,
                });
            }
        }
        if let Some(limit) = self.max_duration {
            let elapsed = self.elapsed();
            if elapsed >= limit {
                return Some(Truncation::TimeCeiling {
                    elapsed_secs: elapsed.as_secs_f64(),
                    limit_secs: limit.as_secs_f64(),
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta(id: &str, cost: f64) -> CostDelta {
        CostDelta {
            sub_debate_id: id.into(),
            cost_usd: cost,
            rounds: 2,
        }
    }

    #[test]
    fn test_fold_in_sums_deltas() {
        let mut acc = CostAccumulator::new(&ExecutionConfig::default());
        acc.fold_in([delta("a", 0.1), delta("b", 0.25)]);
        acc.fold_in([delta("c", 0.05)]);
        assert!((acc.total_cost_usd() - 0.4).abs() < 1e-9);
        assert_eq!(acc.total_rounds(), 6);
        assert_eq!(acc.settled(), 3);
        assert!(acc.breached_ceiling().is_none());
    }

    #[test]
    fn test_cost_ceiling_breach() {
        let config = ExecutionConfig {
            max_cost_usd: Some(0.3),
            ..Default::default()
        };
        let mut acc = CostAccumulator::new(&config);
        acc.fold_in([delta("a", 0.2)]);
        assert!(acc.breached_ceiling().is_none());
        acc.fold_in([delta("b", 0.2)]);
        assert!(matches!(
            acc.breached_ceiling(),
            Some(Truncation::CostCeiling { limit_usd, .. }) if (limit_usd - 0.3).abs() < 1e-9
        ));
    }

    #[test]
    fn test_zero_time_ceiling_breaches_immediately() {
        let config = ExecutionConfig {
            max_duration_secs: Some(0),
            ..Default::default()
        };
        let acc = CostAccumulator::new(&config);
        assert!(matches!(acc.breached_ceiling(), Some(Truncation::TimeCeiling { .. })));
    }
}
