//! Debate pattern (topology) tags.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::errors::DomainError;

/// Closed set of debate topologies. One structure builder exists per tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Simple,
    Sequential,
    Parallel,
    Tournament,
    Adversarial,
    Iterative,
    Ensemble,
    Hierarchical,
    Conditional,
}

impl PatternType {
    /// Tie-break order, highest priority first. `Simple` is last because it is
    /// the always-valid fallback.
    pub const PRIORITY: [PatternType; 9] = [
        PatternType::Conditional,
        PatternType::Tournament,
        PatternType::Adversarial,
        PatternType::Hierarchical,
        PatternType::Sequential,
        PatternType::Parallel,
        PatternType::Iterative,
        PatternType::Ensemble,
        PatternType::Simple,
    ];

    /// Position in [`Self::PRIORITY`]; lower wins ties.
    pub fn priority_rank(self) -> usize {
        Self::PRIORITY
            .iter()
            .position(|p| *p == self)
            .unwrap_or(Self::PRIORITY.len())
    }

    /// Lowercase name used on the command line and in JSON.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Tournament => "tournament",
            Self::Adversarial => "adversarial",
            Self::Iterative => "iterative",
            Self::Ensemble => "ensemble",
            Self::Hierarchical => "hierarchical",
            Self::Conditional => "conditional",
        }
    }
}

impl std::fmt::Display for PatternType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::PRIORITY
            .iter()
            .copied()
            .find(|p| p.as_str() == needle)
            .ok_or_else(|| DomainError::UnknownPattern(s.to_string()))
    }
}

/// Score assigned to one pattern by the scorer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternScore {
    /// Scored pattern.
    pub pattern: PatternType,
    /// Weighted sum over signals.
    pub score: f64,
}
