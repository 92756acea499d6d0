//! Strategy analysis: the selected pattern and its generated structure.

use serde::{Deserialize, Serialize};

use super::pattern::PatternType;
use super::signal::Signal;
use super::structure::DebateStructure;

/// Result of analysing one top-level question. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyAnalysis {
    /// Winning or forced pattern.
    pub recommended_pattern: PatternType,
    /// Confidence in `[0.0, 1.0]`.
    pub confidence: f64,
    /// Runner-up patterns, best first.
    pub alternatives: Vec<PatternType>,
    /// The generated plan.
    pub structure: DebateStructure,
    /// Sum of sub-debate cost estimates.
    pub estimated_cost_usd: f64,
    /// Wall-clock estimate.
    pub estimated_time_minutes: f64,
    /// Signals behind the choice. Empty when the pattern was forced.
    #[serde(default)]
    pub signals: Vec<Signal>,
    /// Whether the pattern came from a manual override.
    #[serde(default)]
    pub forced: bool,
}

impl StrategyAnalysis {
    /// Counts and estimates only.
    pub fn preview(&self) -> StrategyPreview {
        StrategyPreview {
            pattern: self.recommended_pattern,
            confidence: self.confidence,
            phase_count: self.structure.phases.len(),
            debate_count: self.structure.debate_count(),
            estimated_cost_usd: self.estimated_cost_usd,
            estimated_time_minutes: self.estimated_time_minutes,
        }
    }
}

/// Counts and estimates for a plan, computed without executing anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPreview {
    /// Pattern of the plan.
    pub pattern: PatternType,
    /// Confidence in the pattern.
    pub confidence: f64,
    /// Phases in the plan.
    pub phase_count: usize,
    /// Sub-debates in the plan.
    pub debate_count: usize,
    /// Estimated spend.
    pub estimated_cost_usd: f64,
    /// Estimated wall-clock minutes.
    pub estimated_time_minutes: f64,
}

/// Manual override: a forced pattern and/or a forced expert list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyOverride {
    /// Bypass scoring and build this pattern.
    pub pattern: Option<PatternType>,
    /// Roster forced onto every sub-debate.
    pub experts: Option<Vec<String>>,
}

impl StrategyOverride {
    /// Force a pattern.
    pub fn pattern(pattern: PatternType) -> Self {
        Self {
            pattern: Some(pattern),
            experts: None,
        }
    }

    /// Force the expert roster.
    pub fn with_experts(mut self, experts: Vec<String>) -> Self {
        self.experts = Some(experts);
        self
    }

    /// Whether nothing is overridden.
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.experts.as_ref().is_none_or(Vec::is_empty)
    }
}
