use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid {field}: {value}. Must be between 0.0 and 1.0")]
    ThresholdOutOfRange { field: &'static str, value: f64 },

    #[error("Invalid moderation_threshold: {0}. Must be between 0 and 100")]
    InvalidModerationThreshold(f64),

    #[error("Invalid max_rounds: {0}. Must be at least 1")]
    InvalidMaxRounds(u32),

    #[error("Invalid {field}: {value}. Must be positive")]
    NonPositiveCeiling { field: &'static str, value: f64 },

    #[error("Invalid max_duration_secs: 0. Must be at least 1")]
    ZeroDuration,

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .agora/config.yaml (project config)
    /// 3. .agora/local.yaml (local overrides, optional)
    /// 4. Environment variables (AGORA_* prefix, `__` between sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".agora/config.yaml"))
            .merge(Yaml::file(".agora/local.yaml"))
            .merge(Env::prefixed("AGORA_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honouring environment
    /// overrides.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("AGORA_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let unit_ranges = [
            ("consensus_threshold", config.convergence.consensus_threshold),
            ("stagnation_epsilon", config.convergence.stagnation_epsilon),
            ("strict_similarity", config.quality.strict_similarity),
            ("lenient_similarity", config.quality.lenient_similarity),
            ("disagreement_density", config.debate.disagreement_density),
            ("agreement_density", config.debate.agreement_density),
        ];
        for (field, value) in unit_ranges {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { field, value });
            }
        }

        let threshold = config.quality.moderation_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::InvalidModerationThreshold(threshold));
        }

        if config.debate.max_rounds == 0 {
            return Err(ConfigError::InvalidMaxRounds(0));
        }

        let ceilings = [
            ("execution.max_cost_usd", config.execution.max_cost_usd),
            ("convergence.max_cost_usd", config.convergence.max_cost_usd),
        ];
        for (field, ceiling) in ceilings {
            if let Some(value) = ceiling.filter(|v| *v <= 0.0) {
                return Err(ConfigError::NonPositiveCeiling { field, value });
            }
        }
        if config.execution.max_duration_secs == Some(0) {
            return Err(ConfigError::ZeroDuration);
        }

        let weights = config.quality.depth_weight
            + config.quality.diversity_weight
            + config.quality.originality_weight;
        if weights <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "quality weights must sum to a positive value".to_string(),
            ));
        }

        if config.structure.cost_per_debate_usd < 0.0 || config.structure.minutes_per_debate < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "per-debate estimates cannot be negative".to_string(),
            ));
        }

        let lists = [
            ("structure.ensemble_perspectives", &config.structure.ensemble_perspectives),
            ("structure.default_dimensions", &config.structure.default_dimensions),
            ("structure.default_stages", &config.structure.default_stages),
        ];
        for (field, items) in lists {
            if items.is_empty() {
                return Err(ConfigError::ValidationFailed(format!("{field} cannot be empty")));
            }
            let mut seen = std::collections::HashSet::new();
            for item in items {
                let key = item.trim().to_lowercase();
                if key.is_empty() {
                    return Err(ConfigError::ValidationFailed(format!(
                        "{field} contains a blank entry"
                    )));
                }
                if !seen.insert(key) {
                    return Err(ConfigError::ValidationFailed(format!(
                        "{field} lists '{item}' more than once"
                    )));
                }
            }
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::config::{ContinuationShape, LogFormat, SimilarityMode};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!((config.convergence.consensus_threshold - 0.70).abs() < f64::EPSILON);
        assert!((config.quality.moderation_threshold - 60.0).abs() < f64::EPSILON);
        assert_eq!(config.debate.max_rounds, 5);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
structure:
  branch_threshold: 0.6
  else_shape: drilldown
execution:
  max_cost_usd: 2.5
  max_retries: 3
convergence:
  consensus_threshold: 0.8
quality:
  similarity_mode: lenient
logging:
  level: debug
  format: json
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert!((config.structure.branch_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(config.structure.else_shape, ContinuationShape::Drilldown);
        assert_eq!(config.structure.then_shape, ContinuationShape::Conclusion);
        assert_eq!(config.execution.max_cost_usd, Some(2.5));
        assert_eq!(config.execution.max_retries, 3);
        assert!((config.convergence.consensus_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.quality.similarity_mode, SimilarityMode::Lenient);
        assert_eq!(config.logging.format, LogFormat::Json);

        ConfigLoader::validate(&config).expect("Parsed config should be valid");
    }

    #[test]
    fn test_validate_threshold_out_of_range() {
        let mut config = Config::default();
        config.convergence.consensus_threshold = 1.5;

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::ThresholdOutOfRange { field: "consensus_threshold", .. }
        ));
    }

    #[test]
    fn test_validate_moderation_threshold() {
        let mut config = Config::default();
        config.quality.moderation_threshold = 120.0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidModerationThreshold(_)
        ));
    }

    #[test]
    fn test_validate_zero_max_rounds() {
        let mut config = Config::default();
        config.debate.max_rounds = 0;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidMaxRounds(0)
        ));
    }

    #[test]
    fn test_validate_non_positive_ceiling() {
        let mut config = Config::default();
        config.execution.max_cost_usd = Some(0.0);
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::NonPositiveCeiling { field: "execution.max_cost_usd", .. }
        ));

        let mut config = Config::default();
        config.execution.max_duration_secs = Some(0);
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::ZeroDuration
        ));
    }

    #[test]
    fn test_validate_structure_lists() {
        let mut config = Config::default();
        config.structure.ensemble_perspectives.clear();
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => {
                assert!(msg.contains("structure.ensemble_perspectives"), "{msg}");
            }
            other => panic!("Expected ValidationFailed error, got {other}"),
        }

        let mut config = Config::default();
        config.structure.ensemble_perspectives = vec!["risk".into(), "Risk ".into()];
        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::ValidationFailed(msg) => assert!(msg.contains("more than once"), "{msg}"),
            other => panic!("Expected ValidationFailed error, got {other}"),
        }

        let clears: [fn(&mut Config); 2] = [
            |c| c.structure.default_dimensions.clear(),
            |c| c.structure.default_stages.clear(),
        ];
        for clear in clears {
            let mut config = Config::default();
            clear(&mut config);
            assert!(matches!(
                ConfigLoader::validate(&config).unwrap_err(),
                ConfigError::ValidationFailed(_)
            ));
        }
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();

        match ConfigLoader::validate(&config).unwrap_err() {
            ConfigError::InvalidLogLevel(level) => assert_eq!(level, "verbose"),
            other => panic!("Expected InvalidLogLevel error, got {other}"),
        }
    }

    #[test]
    fn test_hierarchical_merging() {
        let mut base_file = NamedTempFile::new().unwrap();
        writeln!(
            base_file,
            "debate:\n  max_rounds: 4\nlogging:\n  level: info\n  format: json"
        )
        .unwrap();
        base_file.flush().unwrap();

        let mut override_file = NamedTempFile::new().unwrap();
        writeln!(override_file, "debate:\n  max_rounds: 7\nlogging:\n  level: debug").unwrap();
        override_file.flush().unwrap();

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.debate.max_rounds, 7, "Override should win");
        assert_eq!(config.logging.level, "debug", "Override should win for nested fields");
        assert_eq!(
            config.logging.format,
            LogFormat::Json,
            "Base value should persist when not overridden"
        );
        assert_eq!(
            config.debate.default_roster.len(),
            4,
            "Defaults should fill untouched sections"
        );
    }

    #[test]
    fn test_env_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "convergence:\n  consensus_threshold: 0.75").unwrap();
        file.flush().unwrap();

        temp_env::with_vars(
            [
                ("AGORA_CONVERGENCE__CONSENSUS_THRESHOLD", Some("0.9")),
                ("AGORA_DEBATE__MAX_ROUNDS", Some("3")),
            ],
            || {
                let config = ConfigLoader::load_from_file(file.path()).unwrap();
                assert!((config.convergence.consensus_threshold - 0.9).abs() < f64::EPSILON);
                assert_eq!(config.debate.max_rounds, 3);
            },
        );
    }

    #[test]
    fn test_env_value_is_validated() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "debate:\n  max_rounds: 5").unwrap();
        file.flush().unwrap();
        temp_env::with_var("AGORA_DEBATE__MAX_ROUNDS", Some("0"), || {
            let err = ConfigLoader::load_from_file(file.path()).unwrap_err();
            assert!(err.to_string().contains("max_rounds"));
        });
    }
}
