//! Strategy selection: detect, score, and build in one pass.

use tracing::info;

use crate::domain::errors::DomainResult;
use crate::domain::models::{StrategyAnalysis, StrategyOverride, StructureConfig};
use crate::services::pattern_scorer::PatternScorer;
use crate::services::signal_detector::SignalDetector;
use crate::services::structure_generator::StructureGenerator;

/// Runner-up patterns reported next to the recommendation.
const MAX_ALTERNATIVES: usize = 3;

/// Detects signals, scores patterns and generates the structure.
#[derive(Debug, Clone, Default)]
pub struct StrategySelector {
    detector: SignalDetector,
    scorer: PatternScorer,
    generator: StructureGenerator,
}

impl StrategySelector {
    /// A selector generating structures with `config`.
    pub fn new(config: StructureConfig) -> Self {
        Self {
            detector: SignalDetector::new(),
            scorer: PatternScorer::new(),
            generator: StructureGenerator::new(config),
        }
    }

    /// Pick a pattern for the question and build its structure.
    pub fn analyze(&self, question: &str) -> DomainResult<StrategyAnalysis> {
        self.analyze_with_override(question, &StrategyOverride::default())
    }

    /// Like [`Self::analyze`], but a forced pattern bypasses scoring and forced
    /// experts are applied to every sub-debate. Options and factors are still
    /// extracted because the builders are parameterized by them.
    pub fn analyze_with_override(
        &self,
        question: &str,
        overrides: &StrategyOverride,
    ) -> DomainResult<StrategyAnalysis> {
        let detection = self.detector.detect(question)?;

        let (pattern, confidence, alternatives, signals) = match overrides.pattern {
            Some(forced) => (forced, 1.0, Vec::new(), Vec::new()),
            None => {
                let ranking = self.scorer.score(&detection.signals);
                (
                    ranking.winner(),
                    ranking.confidence,
                    ranking.alternatives(MAX_ALTERNATIVES),
                    detection.signals,
                )
            }
        };

        let mut structure = self.generator.generate(pattern, &detection.parameters)?;
        if let Some(experts) = overrides.experts.as_ref().filter(|e| !e.is_empty()) {
            structure.force_experts(experts);
        }

        info!(
            pattern = %pattern,
            confidence,
            forced = overrides.pattern.is_some(),
            phases = structure.phases.len(),
            debates = structure.debate_count(),
            "Selected debate strategy"
        );

        Ok(StrategyAnalysis {
            recommended_pattern: pattern,
            confidence,
            alternatives,
            estimated_cost_usd: structure.estimated_cost_usd(),
            estimated_time_minutes: structure.estimated_time_minutes(),
            structure,
            signals,
            forced: overrides.pattern.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::DomainError;
    use crate::domain::models::PatternType;

    #[test]
    fn test_options_question_selects_tournament() {
        let analysis = StrategySelector::default()
            .analyze("¿Dónde abrir la nueva oficina: Madrid, Lisboa, Berlín o Varsovia?")
            .unwrap();
        assert_eq!(analysis.recommended_pattern, PatternType::Tournament);
        assert_eq!(analysis.structure.phases.len(), 2);
        assert!(!analysis.alternatives.contains(&PatternType::Tournament));
        assert!(analysis.estimated_cost_usd > 0.0);
    }

    #[test]
    fn test_plain_question_falls_back_to_simple() {
        let analysis = StrategySelector::default().analyze("Hola equipo").unwrap();
        assert_eq!(analysis.recommended_pattern, PatternType::Simple);
        assert!((analysis.confidence - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_forced_pattern_bypasses_scoring() {
        let overrides = StrategyOverride::pattern(PatternType::Ensemble);
        let analysis = StrategySelector::default()
            .analyze_with_override("¿Madrid, Lisboa o Berlín?", &overrides)
            .unwrap();
        assert_eq!(analysis.recommended_pattern, PatternType::Ensemble);
        assert!(analysis.forced);
        assert!(analysis.signals.is_empty());
        assert!((analysis.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_forced_experts_reach_every_debate() {
        let overrides = StrategyOverride::default().with_experts(vec!["cfo".into()]);
        let analysis = StrategySelector::default()
            .analyze_with_override("¿Madrid, Lisboa o Berlín?", &overrides)
            .unwrap();
        assert!(analysis
            .structure
            .sub_debates()
            .all(|(_, d)| d.force_experts.as_deref() == Some(&["cfo".to_string()][..])));
    }

    #[test]
    fn test_empty_question_fails_before_scoring() {
        let err = StrategySelector::default().analyze("").unwrap_err();
        assert!(matches!(err, DomainError::SignalDetection(_)));
    }
}
