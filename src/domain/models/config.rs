use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Agora
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Structure generation parameters and estimates
    #[serde(default)]
    pub structure: StructureConfig,

    /// Phase executor ceilings and retries
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Round state machine settings
    #[serde(default)]
    pub debate: DebateConfig,

    /// iMAD stop rules
    #[serde(default)]
    pub convergence: ConvergenceConfig,

    /// Quality monitor thresholds
    #[serde(default)]
    pub quality: QualityConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Shape of a conditional continuation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContinuationShape {
    /// One synthesis debate that closes the question.
    Conclusion,
    /// Two sequential debates: surface the disagreement, then resolve it.
    Refinement,
    /// One parallel debate per factor (or default dimension).
    Drilldown,
}

/// Structure generator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    /// Advisory cost estimate per sub-debate (USD)
    pub cost_per_debate_usd: f64,
    /// Advisory time estimate per sub-debate (minutes)
    pub minutes_per_debate: f64,
    /// Perspectives used by the ensemble pattern
    pub ensemble_perspectives: Vec<String>,
    /// Dimensions used by parallel/drilldown shapes when the question lists no factors
    pub default_dimensions: Vec<String>,
    /// Stages used by the sequential pattern when the question lists no factors
    pub default_stages: Vec<String>,
    /// Number of refine phases in the iterative pattern
    pub refinement_passes: usize,
    /// Aggregate field the conditional branch compares
    pub branch_field: String,
    /// Threshold the conditional branch compares against
    pub branch_threshold: f64,
    /// Continuation when the branch condition holds
    pub then_shape: ContinuationShape,
    /// Continuation when it does not
    pub else_shape: ContinuationShape,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            cost_per_debate_usd: 0.15,
            minutes_per_debate: 3.0,
            ensemble_perspectives: vec![
                "optimistic".to_string(),
                "conservative".to_string(),
                "disruptive".to_string(),
            ],
            default_dimensions: vec![
                "market".to_string(),
                "finance".to_string(),
                "operations".to_string(),
            ],
            default_stages: vec![
                "diagnosis".to_string(),
                "alternatives".to_string(),
                "recommendation".to_string(),
            ],
            refinement_passes: 1,
            branch_field: "consensus_score".to_string(),
            branch_threshold: 0.7,
            then_shape: ContinuationShape::Conclusion,
            else_shape: ContinuationShape::Refinement,
        }
    }
}

/// Phase executor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Cost ceiling for the whole orchestration (USD), checked before each phase
    pub max_cost_usd: Option<f64>,
    /// Wall-clock ceiling for the whole orchestration (seconds)
    pub max_duration_secs: Option<u64>,
    /// Retries after a provider error before the sub-debate is recorded as failed
    pub max_retries: u32,
    /// Delay between retries (milliseconds)
    pub retry_delay_ms: u64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_cost_usd: None,
            max_duration_secs: None,
            max_retries: 1,
            retry_delay_ms: 500,
        }
    }
}

/// Round state machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    /// Hard cap on rounds per sub-debate
    pub max_rounds: u32,
    /// Roster used when neither a matcher nor a forced list supplies one
    pub default_roster: Vec<String>,
    /// Disagreement keyword density that puts the critic next
    pub disagreement_density: f64,
    /// Agreement keyword density that puts the synthesizer next
    pub agreement_density: f64,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            max_rounds: 5,
            default_roster: vec![
                "strategist".to_string(),
                "analyst".to_string(),
                "critic".to_string(),
                "synthesizer".to_string(),
            ],
            disagreement_density: 0.04,
            agreement_density: 0.04,
        }
    }
}

/// Cost/convergence controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Consensus at or above which a sub-debate stops
    pub consensus_threshold: f64,
    /// Cost ceiling per sub-debate (USD)
    pub max_cost_usd: Option<f64>,
    /// Consecutive unchanged rounds that count as stagnation
    pub stagnation_rounds: u32,
    /// Largest consensus delta still considered "no change"
    pub stagnation_epsilon: f64,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            consensus_threshold: 0.70,
            max_cost_usd: None,
            stagnation_rounds: 2,
            stagnation_epsilon: 0.02,
        }
    }
}

/// How aggressively near-duplicate messages are flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    Strict,
    Lenient,
}

/// Quality monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// Overall quality below which moderation is requested (0-100)
    pub moderation_threshold: f64,
    /// Messages required before any judgement is made
    pub min_messages: usize,
    /// Word count a message needs for full length credit
    pub min_depth_words: usize,
    /// Which similarity threshold repetition checks use
    pub similarity_mode: SimilarityMode,
    /// Jaccard similarity counted as repetition in strict mode
    pub strict_similarity: f64,
    /// Jaccard similarity counted as repetition in lenient mode
    pub lenient_similarity: f64,
    /// Weight of depth in overall quality
    pub depth_weight: f64,
    /// Weight of diversity in overall quality
    pub diversity_weight: f64,
    /// Weight of originality in overall quality
    pub originality_weight: f64,
    /// Consecutive turns by one role that count as dominance
    pub dominance_run: usize,
}

impl QualityConfig {
    /// Similarity at or above which two messages are near-duplicates.
    pub fn similarity_threshold(&self) -> f64 {
        match self.similarity_mode {
            SimilarityMode::Strict => self.strict_similarity,
            SimilarityMode::Lenient => self.lenient_similarity,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            moderation_threshold: 60.0,
            min_messages: 3,
            min_depth_words: 20,
            similarity_mode: SimilarityMode::Strict,
            strict_similarity: 0.6,
            lenient_similarity: 0.8,
            depth_weight: 0.4,
            diversity_weight: 0.3,
            originality_weight: 0.3,
            dominance_run: 3,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

/// Rolling file policy
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for file output
    #[serde(default = "default_rotation")]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

const fn default_rotation() -> RotationPolicy {
    RotationPolicy::Daily
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!((config.convergence.consensus_threshold - 0.70).abs() < f64::EPSILON);
        assert!((config.quality.moderation_threshold - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.structure.ensemble_perspectives.len(), 3);
        assert_eq!(config.structure.then_shape, ContinuationShape::Conclusion);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r"
convergence:
  consensus_threshold: 0.8
quality:
  similarity_mode: lenient
structure:
  else_shape: drilldown
";
        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");
        assert!((config.convergence.consensus_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.convergence.stagnation_rounds, 2);
        assert!((config.quality.similarity_threshold() - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.structure.else_shape, ContinuationShape::Drilldown);
        assert_eq!(config.debate.max_rounds, 5);
    }
}
