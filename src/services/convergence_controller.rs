//! iMAD cost/convergence controller.
//!
//! Decides after every round whether a sub-debate continues. The decision is
//! a function of the round snapshots alone, so it is identical for every
//! pattern that embeds the sub-debate.

use serde::{Deserialize, Serialize};

use crate::domain::models::{ConvergenceConfig, StopReason};

/// What the controller sees of one closed round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    /// Round just closed.
    pub round: u32,
    /// Consensus after the round.
    pub consensus: f64,
    /// Leading option after the round.
    pub top_option: Option<String>,
    /// Cost accumulated by the sub-debate up to and including this round.
    pub cumulative_cost_usd: f64,
}

/// Whether the round loop goes on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ConvergenceDecision {
    /// Play another round.
    Continue,
    /// Stop and synthesize.
    Stop { reason: StopReason },
}

impl ConvergenceDecision {
    /// Whether the decision stops the loop.
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop { .. })
    }

    /// The reason, when stopping.
    pub fn stop_reason(&self) -> Option<&StopReason> {
        match self {
            Self::Stop { reason } => Some(reason),
            Self::Continue => None,
        }
    }
}

/// Decides after each round whether a sub-debate should continue.
#[derive(Debug, Clone)]
pub struct ConvergenceController {
    config: ConvergenceConfig,
    max_rounds: u32,
}

impl ConvergenceController {
    /// A controller stopping no later than `max_rounds`.
    pub fn new(config: ConvergenceConfig, max_rounds: u32) -> Self {
        Self { config, max_rounds }
    }

    /// Decide after the last snapshot in `history`. Rules are checked in a
    /// fixed order: consensus, cost ceiling, stagnation, max rounds.
    pub fn decide(&self, history: &[RoundSnapshot]) -> ConvergenceDecision {
        let Some(last) = history.last() else {
            return ConvergenceDecision::Continue;
        };

        if last.consensus >= self.config.consensus_threshold {
            return stop(StopReason::Consensus {
                score: last.consensus,
            });
        }

        if let Some(limit) = self.config.max_cost_usd {
            if last.cumulative_cost_usd > limit {
                return stop(StopReason::CostCeiling {
                    spent_usd: last.cumulative_cost_usd,
                    limit_usd: limit,
                });
            }
        }

        if self.is_stagnant(history) {
            return stop(StopReason::Stagnation {
                rounds: self.config.stagnation_rounds,
            });
        }

        if last.round >= self.max_rounds {
            return stop(StopReason::MaxRounds {
                rounds: self.max_rounds,
            });
        }

        ConvergenceDecision::Continue
    }

    /// The last `stagnation_rounds` rounds each moved consensus by less than
    /// epsilon and kept the same leading option.
    fn is_stagnant(&self, history: &[RoundSnapshot]) -> bool {
        let n = self.config.stagnation_rounds as usize;
        if n == 0 || history.len() < n + 1 {
            return false;
        }
        history[history.len() - n - 1..].windows(2).all(|w| {
            (w[1].consensus - w[0].consensus).abs() < self.config.stagnation_epsilon
                && w[1].top_option == w[0].top_option
        })
    }
}

fn stop(reason: StopReason) -> ConvergenceDecision {
    ConvergenceDecision::Stop { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(round: u32, consensus: f64, top: &str, cost: f64) -> RoundSnapshot {
        RoundSnapshot {
            round,
            consensus,
            top_option: Some(top.to_string()),
            cumulative_cost_usd: cost,
        }
    }

    fn controller() -> ConvergenceController {
        ConvergenceController::new(ConvergenceConfig::default(), 5)
    }

    #[test]
    fn test_stops_the_round_consensus_is_reached() {
        let c = controller();
        let mut history = vec![snap(1, 0.5, "a", 0.1)];
        assert_eq!(c.decide(&history), ConvergenceDecision::Continue);
        history.push(snap(2, 0.70, "a", 0.2));
        assert!(matches!(
            c.decide(&history).stop_reason(),
            Some(StopReason::Consensus { .. })
        ));
    }

    #[test]
    fn test_cost_ceiling() {
        let c = ConvergenceController::new(
            ConvergenceConfig {
                max_cost_usd: Some(0.25),
                ..Default::default()
            },
            5,
        );
        let history = vec![snap(1, 0.3, "a", 0.1), snap(2, 0.4, "b", 0.3)];
        assert!(matches!(
            c.decide(&history).stop_reason(),
            Some(StopReason::CostCeiling { .. })
        ));
    }

    #[test]
    fn test_stagnation_needs_unchanged_leader() {
        let c = controller();
        let flat = vec![snap(1, 0.40, "a", 0.1), snap(2, 0.41, "a", 0.2), snap(3, 0.40, "a", 0.3)];
        assert!(matches!(
            c.decide(&flat).stop_reason(),
            Some(StopReason::Stagnation { rounds: 2 })
        ));

        let leader_moves = vec![snap(1, 0.40, "a", 0.1), snap(2, 0.41, "b", 0.2), snap(3, 0.40, "b", 0.3)];
        assert_eq!(c.decide(&leader_moves), ConvergenceDecision::Continue);
    }

    #[test]
    fn test_max_rounds() {
        let c = ConvergenceController::new(ConvergenceConfig::default(), 2);
        let history = vec![snap(1, 0.1, "a", 0.1), snap(2, 0.5, "b", 0.2)];
        assert!(matches!(
            c.decide(&history).stop_reason(),
            Some(StopReason::MaxRounds { rounds: 2 })
        ));
    }

    #[test]
    fn test_consensus_wins_over_other_rules() {
        let c = ConvergenceController::new(
            ConvergenceConfig {
                max_cost_usd: Some(0.01),
                ..Default::default()
            },
            1,
        );
        let history = vec![snap(1, 0.9, "a", 1.0)];
        assert!(matches!(
            c.decide(&history).stop_reason(),
            Some(StopReason::Consensus { .. })
        ));
    }
}
