//! Ensemble configuration
//!
//! Defaults, overridden by a TOML file and/or `ENSEMBLE_*` environment
//! variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ensemble::arbitration::DEFAULT_DISAGREEMENT_THRESHOLD;
use crate::ensemble::voting::VotingStrategy;
use crate::ensemble::weights::{DEFAULT_DECAY_FACTOR, DEFAULT_LEARNING_RATE};
use crate::error::{EnsembleError, EnsembleResult};
use crate::evaluation::ScoreMetric;

/// Configuration for the ensemble pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnsembleConfig {
    /// Aggregation strategy for single-item rounds
    pub strategy: VotingStrategy,

    /// Learning rate of the weight adjuster
    pub learning_rate: f64,

    /// Decay factor of the weight adjuster
    pub decay_factor: f64,

    /// Consensus threshold for batch resolution, in [0, 1]
    pub disagreement_threshold: f64,

    /// Drop aggregated labels scoring below this, in [0, 1]
    pub noise_threshold: Option<f64>,

    /// Metric used as the performance score for weight updates
    pub score_metric: ScoreMetric,

    /// Whether aggregated results carry a generation timestamp
    pub attach_timestamp: bool,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            strategy: VotingStrategy::Weighted,
            learning_rate: DEFAULT_LEARNING_RATE,
            decay_factor: DEFAULT_DECAY_FACTOR,
            disagreement_threshold: DEFAULT_DISAGREEMENT_THRESHOLD,
            noise_threshold: None,
            score_metric: ScoreMetric::F1,
            attach_timestamp: true,
        }
    }
}

impl EnsembleConfig {
    /// Create config from environment variables
    pub fn from_env() -> EnsembleResult<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load config from a TOML file; missing keys keep their defaults
    pub fn from_toml_file(path: &Path) -> EnsembleResult<Self> {
        if !path.exists() {
            return Err(EnsembleError::resource_not_found(path));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| EnsembleError::config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `ENSEMBLE_*` overrides read through `lookup`
    pub fn with_env_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> EnsembleResult<Self> {
        if let Some(value) = lookup("ENSEMBLE_STRATEGY") {
            self.strategy = value.parse()?;
        }
        if let Some(value) = lookup("ENSEMBLE_LEARNING_RATE") {
            self.learning_rate = parse_number("ENSEMBLE_LEARNING_RATE", &value)?;
        }
        if let Some(value) = lookup("ENSEMBLE_DECAY_FACTOR") {
            self.decay_factor = parse_number("ENSEMBLE_DECAY_FACTOR", &value)?;
        }
        if let Some(value) = lookup("ENSEMBLE_DISAGREEMENT_THRESHOLD") {
            self.disagreement_threshold = parse_number("ENSEMBLE_DISAGREEMENT_THRESHOLD", &value)?;
        }
        if let Some(value) = lookup("ENSEMBLE_NOISE_THRESHOLD") {
            self.noise_threshold = if value.trim().is_empty() {
                None
            } else {
                Some(parse_number("ENSEMBLE_NOISE_THRESHOLD", &value)?)
            };
        }
        if let Some(value) = lookup("ENSEMBLE_SCORE_METRIC") {
            self.score_metric = value.parse()?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> EnsembleResult<()> {
        if !self.learning_rate.is_finite() || !self.decay_factor.is_finite() {
            return Err(EnsembleError::config(
                "learning_rate and decay_factor must be finite",
            ));
        }
        if self.learning_rate < 0.0 || self.decay_factor < 0.0 {
            return Err(EnsembleError::config(format!(
                "learning_rate and decay_factor must be non-negative, got {} and {}",
                self.learning_rate, self.decay_factor
            )));
        }
        if !(0.0..=1.0).contains(&self.disagreement_threshold) {
            return Err(EnsembleError::config(format!(
                "disagreement_threshold must be within [0, 1], got {}",
                self.disagreement_threshold
            )));
        }
        if let Some(threshold) = self.noise_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(EnsembleError::config(format!(
                    "noise_threshold must be within [0, 1], got {}",
                    threshold
                )));
            }
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> EnsembleResult<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| EnsembleError::config(format!("{} is not a number: '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EnsembleConfig::default();
        assert_eq!(config.strategy, VotingStrategy::Weighted);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.decay_factor, 0.99);
        assert_eq!(config.disagreement_threshold, 0.2);
        assert!(config.noise_threshold.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = EnsembleConfig::default()
            .with_env_overrides(lookup(&[
                ("ENSEMBLE_STRATEGY", "majority"),
                ("ENSEMBLE_LEARNING_RATE", "0.25"),
                ("ENSEMBLE_DISAGREEMENT_THRESHOLD", "0.6"),
                ("ENSEMBLE_NOISE_THRESHOLD", "0.4"),
                ("ENSEMBLE_SCORE_METRIC", "accuracy"),
            ]))
            .unwrap();

        assert_eq!(config.strategy, VotingStrategy::Majority);
        assert_eq!(config.learning_rate, 0.25);
        assert_eq!(config.decay_factor, 0.99);
        assert_eq!(config.disagreement_threshold, 0.6);
        assert_eq!(config.noise_threshold, Some(0.4));
        assert_eq!(config.score_metric, ScoreMetric::Accuracy);
    }

    #[test]
    fn test_env_rejects_bad_values() {
        let bad_number = EnsembleConfig::default()
            .with_env_overrides(lookup(&[("ENSEMBLE_DECAY_FACTOR", "fast")]));
        assert!(matches!(bad_number, Err(EnsembleError::Config { .. })));

        let out_of_range = EnsembleConfig::default()
            .with_env_overrides(lookup(&[("ENSEMBLE_DISAGREEMENT_THRESHOLD", "1.5")]));
        assert!(out_of_range.is_err());
    }

    #[test]
    fn test_rejects_negative_update_parameters() {
        let negative_decay = EnsembleConfig {
            decay_factor: -0.5,
            ..Default::default()
        };
        assert!(matches!(negative_decay.validate(), Err(EnsembleError::Config { .. })));

        let negative_rate = EnsembleConfig::default()
            .with_env_overrides(lookup(&[("ENSEMBLE_LEARNING_RATE", "-0.1")]));
        assert!(matches!(negative_rate, Err(EnsembleError::Config { .. })));

        // no decay and growth above one both stay valid
        let edges = EnsembleConfig {
            learning_rate: 0.0,
            decay_factor: 1.2,
            ..Default::default()
        };
        assert!(edges.validate().is_ok());
    }

    #[test]
    fn test_toml_file_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ensemble.toml");
        std::fs::write(
            &path,
            "strategy = \"majority\"\ndisagreement_threshold = 0.6\nnoise_threshold = 0.3\n",
        )
        .unwrap();

        let config = EnsembleConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.strategy, VotingStrategy::Majority);
        assert_eq!(config.disagreement_threshold, 0.6);
        assert_eq!(config.noise_threshold, Some(0.3));
        assert_eq!(config.learning_rate, 0.1);
    }

    #[test]
    fn test_toml_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            EnsembleConfig::from_toml_file(&dir.path().join("missing.toml")),
            Err(EnsembleError::ResourceNotFound { .. })
        ));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "strategy = \"unanimous\"\n").unwrap();
        assert!(matches!(
            EnsembleConfig::from_toml_file(&path),
            Err(EnsembleError::Config { .. })
        ));
    }
}
