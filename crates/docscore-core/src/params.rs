//! Training hyperparameters
//!
//! Field names serialize with the engine's conventional spelling
//! (`wordNgrams`, `minCount`) so metrics artifacts stay readable by
//! downstream reporting.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Loss function used during fitting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LossKind {
    /// Softmax over all labels
    #[default]
    Softmax,
    /// Independent sigmoid per label
    Ova,
}

impl LossKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Softmax => "softmax",
            Self::Ova => "ova",
        }
    }
}

/// Hyperparameters handed to the engine on every fit
///
/// Defaults are held constant across runs; metrics are only comparable
/// between runs trained with identical values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainParams {
    /// Initial learning rate
    #[serde(default = "default_lr")]
    pub lr: f32,

    /// Passes over the corpus
    #[serde(default = "default_epoch")]
    pub epoch: usize,

    /// Longest word n-gram used as a feature
    #[serde(rename = "wordNgrams", default = "default_word_ngrams")]
    pub word_ngrams: usize,

    /// Words seen fewer times than this are dropped from the vocabulary
    #[serde(rename = "minCount", default = "default_min_count")]
    pub min_count: usize,

    /// Loss function
    #[serde(default)]
    pub loss: LossKind,

    /// Hash slots for n-gram features
    #[serde(default = "default_bucket")]
    pub bucket: usize,
}

impl Default for TrainParams {
    fn default() -> Self {
        Self {
            lr: default_lr(),
            epoch: default_epoch(),
            word_ngrams: default_word_ngrams(),
            min_count: default_min_count(),
            loss: LossKind::default(),
            bucket: default_bucket(),
        }
    }
}

impl TrainParams {
    /// Reject values the engine cannot train with
    pub fn validate(&self) -> Result<()> {
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(Error::config(format!("lr must be positive, got {}", self.lr)));
        }
        if self.epoch == 0 {
            return Err(Error::config("epoch must be at least 1"));
        }
        if self.word_ngrams == 0 {
            return Err(Error::config("wordNgrams must be at least 1"));
        }
        if self.min_count == 0 {
            return Err(Error::config("minCount must be at least 1"));
        }
        if self.word_ngrams > 1 && self.bucket == 0 {
            return Err(Error::config("bucket must be non-zero when wordNgrams > 1"));
        }
        Ok(())
    }

    /// Set learning rate
    pub fn with_lr(mut self, lr: f32) -> Self {
        self.lr = lr;
        self
    }

    /// Set epoch count
    pub fn with_epoch(mut self, epoch: usize) -> Self {
        self.epoch = epoch;
        self
    }

    /// Set n-gram order
    pub fn with_word_ngrams(mut self, word_ngrams: usize) -> Self {
        self.word_ngrams = word_ngrams;
        self
    }

    /// Set minimum token count
    pub fn with_min_count(mut self, min_count: usize) -> Self {
        self.min_count = min_count;
        self
    }

    /// Set loss function
    pub fn with_loss(mut self, loss: LossKind) -> Self {
        self.loss = loss;
        self
    }

    /// Set bucket count
    pub fn with_bucket(mut self, bucket: usize) -> Self {
        self.bucket = bucket;
        self
    }
}

fn default_lr() -> f32 {
    0.5
}

fn default_epoch() -> usize {
    25
}

fn default_word_ngrams() -> usize {
    2
}

fn default_min_count() -> usize {
    1
}

fn default_bucket() -> usize {
    1 << 20
}
