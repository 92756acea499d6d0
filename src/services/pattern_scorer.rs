//! Pattern scoring: a deterministic weighted sum over detected signals.

use std::collections::HashMap;

use crate::domain::models::{PatternScore, PatternType, Signal, SignalType};

/// Score every pattern gets regardless of signals, so the list is never empty.
pub const SIMPLE_BASELINE: f64 = 0.1;

/// Confidence reported when no signal was detected.
const NO_SIGNAL_CONFIDENCE: f64 = 0.5;
const MAX_CONFIDENCE: f64 = 0.95;

/// Fixed weights each signal contributes, scaled by the signal's strength.
fn weights(signal: &Signal) -> &'static [(PatternType, f64)] {
    use PatternType::*;
    match signal.signal_type {
        SignalType::BinaryChoice => &[(Adversarial, 0.8), (Simple, 0.5)],
        SignalType::MultipleOptions if signal.evidence.len() >= 3 => {
            &[(Tournament, 2.0), (Ensemble, 0.3)]
        }
        SignalType::MultipleOptions => &[(Adversarial, 0.6), (Simple, 0.3)],
        SignalType::BroadStrategic => &[(Hierarchical, 1.0), (Parallel, 0.6)],
        SignalType::FactorList => &[(Parallel, 0.9), (Sequential, 0.4), (Hierarchical, 0.3)],
        SignalType::SequentialSteps => &[(Sequential, 1.0), (Iterative, 0.2)],
        SignalType::Conditional => &[(Conditional, 1.0)],
        SignalType::RiskFocus => &[(Adversarial, 1.0), (Ensemble, 0.2)],
        SignalType::Refinement => &[(Iterative, 1.0), (Sequential, 0.2)],
        SignalType::MultiPerspective => &[(Ensemble, 1.0), (Parallel, 0.3)],
    }
}

/// Ranked pattern scores plus the confidence in the winner.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternRanking {
    /// Positive scores, best first. Always contains `Simple`.
    pub scores: Vec<PatternScore>,
    /// Winner's share of the top two scores, capped at 0.95.
    pub confidence: f64,
}

impl PatternRanking {
    /// The top pattern; `Simple` when nothing scored.
    pub fn winner(&self) -> PatternType {
        self.scores
            .first()
            .map_or(PatternType::Simple, |s| s.pattern)
    }

    /// Runner-up patterns, at most `limit`.
    pub fn alternatives(&self, limit: usize) -> Vec<PatternType> {
        self.scores.iter().skip(1).take(limit).map(|s| s.pattern).collect()
    }

    /// Score of a pattern, zero when it did not score.
    pub fn score_of(&self, pattern: PatternType) -> f64 {
        self.scores
            .iter()
            .find(|s| s.pattern == pattern)
            .map_or(0.0, |s| s.score)
    }
}

/// Deterministic scorer over detected signals.
#[derive(Debug, Clone, Default)]
pub struct PatternScorer;

impl PatternScorer {
    /// A scorer with the fixed weight table.
    pub fn new() -> Self {
        Self
    }

    /// Rank patterns for the given signals. Ties go to the pattern that comes
    /// first in [`PatternType::PRIORITY`].
    pub fn score(&self, signals: &[Signal]) -> PatternRanking {
        let mut totals: HashMap<PatternType, f64> = HashMap::new();
        totals.insert(PatternType::Simple, SIMPLE_BASELINE);

        for signal in signals.iter().filter(|s| s.detected) {
            for (pattern, weight) in weights(signal) {
                *totals.entry(*pattern).or_insert(0.0) += weight * signal.strength;
            }
        }

        let mut scores: Vec<PatternScore> = totals
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .map(|(pattern, score)| PatternScore { pattern, score })
            .collect();
        scores.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.pattern.priority_rank().cmp(&b.pattern.priority_rank()))
        });

        let confidence = if signals.iter().all(|s| !s.detected) {
            NO_SIGNAL_CONFIDENCE
        } else {
            let top = scores.first().map_or(0.0, |s| s.score);
            let second = scores.get(1).map_or(0.0, |s| s.score);
            if top + second > 0.0 {
                (top / (top + second)).min(MAX_CONFIDENCE)
            } else {
                NO_SIGNAL_CONFIDENCE
            }
        };

        PatternRanking { scores, confidence }
    }
}
