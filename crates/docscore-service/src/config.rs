//! Service configuration

use docscore_core::{Error, Result, TrainParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration shared by the training and scoring paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory holding one artifact per trained model
    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    /// Directory holding the metrics artifacts
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// Local positive-example pool (directory or one-doc-per-line file)
    #[serde(default = "default_positive_pool")]
    pub positive_pool: PathBuf,

    /// Local negative-example pool (directory or one-doc-per-line file)
    #[serde(default = "default_negative_pool")]
    pub negative_pool: PathBuf,

    /// Where training corpora are staged; OS temp dir when unset
    #[serde(default)]
    pub scratch_dir: Option<PathBuf>,

    /// Seed for negative sampling and shuffling
    #[serde(default)]
    pub seed: Option<u64>,

    /// Hyperparameters used for every run unless overridden per call
    #[serde(default)]
    pub params: TrainParams,

    /// Post-training evaluation
    #[serde(default)]
    pub evaluation: EvaluationConfig,

    /// Model cache
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ServiceConfig {
    /// Load from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Reject values no run could succeed with
    pub fn validate(&self) -> Result<()> {
        self.params.validate()?;

        if self.evaluation.sample_size == 0 {
            return Err(Error::config("evaluation.sample_size must be at least 1"));
        }
        let fraction = self.evaluation.holdout_fraction;
        if !(fraction > 0.0 && fraction < 1.0) {
            return Err(Error::config(format!(
                "evaluation.holdout_fraction must be in (0, 1), got {}",
                fraction
            )));
        }
        if self.cache.capacity == Some(0) {
            return Err(Error::config("cache.capacity must be at least 1 when set"));
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            models_dir: default_models_dir(),
            logs_dir: default_logs_dir(),
            positive_pool: default_positive_pool(),
            negative_pool: default_negative_pool(),
            scratch_dir: None,
            seed: None,
            params: TrainParams::default(),
            evaluation: EvaluationConfig::default(),
            cache: CacheConfig::default(),
        }
    }
}

/// Which documents a freshly trained model is evaluated on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStrategy {
    /// Sample from the same documents used for training
    #[default]
    SelfConsistent,
    /// Reserve a per-class slice that training never sees
    Holdout,
}

/// Evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Documents evaluated per class (fewer if the class has fewer)
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    #[serde(default)]
    pub strategy: EvaluationStrategy,

    /// Share of each class reserved under `holdout`
    #[serde(default = "default_holdout_fraction")]
    pub holdout_fraction: f64,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            strategy: EvaluationStrategy::default(),
            holdout_fraction: default_holdout_fraction(),
        }
    }
}

/// Model cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum models held in memory; unbounded when absent
    #[serde(default)]
    pub capacity: Option<usize>,
}

fn default_models_dir() -> PathBuf {
    PathBuf::from("trained_models")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_positive_pool() -> PathBuf {
    PathBuf::from("data/train/positive")
}

fn default_negative_pool() -> PathBuf {
    PathBuf::from("data/train/negative")
}

fn default_sample_size() -> usize {
    100
}

fn default_holdout_fraction() -> f64 {
    0.2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.models_dir, PathBuf::from("trained_models"));
        assert_eq!(config.evaluation.sample_size, 100);
        assert_eq!(config.evaluation.strategy, EvaluationStrategy::SelfConsistent);
        assert!(config.cache.capacity.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = r#"
models_dir: /var/lib/docscore/models
seed: 7
params:
  epoch: 10
  wordNgrams: 3
evaluation:
  strategy: holdout
cache:
  capacity: 4
"#;
        let config = ServiceConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.models_dir, PathBuf::from("/var/lib/docscore/models"));
        assert_eq!(config.logs_dir, PathBuf::from("logs"));
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.params.epoch, 10);
        assert_eq!(config.params.word_ngrams, 3);
        assert_eq!(config.params.lr, 0.5);
        assert_eq!(config.evaluation.strategy, EvaluationStrategy::Holdout);
        assert_eq!(config.evaluation.holdout_fraction, 0.2);
        assert_eq!(config.cache.capacity, Some(4));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServiceConfig::default();
        config.evaluation.holdout_fraction = 1.0;
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.cache.capacity = Some(0);
        assert!(config.validate().is_err());

        let mut config = ServiceConfig::default();
        config.params.epoch = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let yaml = "evaluation:\n  strategy: crossfold\n";
        assert!(ServiceConfig::from_yaml(yaml).is_err());
    }
}
