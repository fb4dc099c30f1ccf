//! Post-training evaluation

use crate::config::{EvaluationConfig, EvaluationStrategy};
use docscore_core::{normalize_text, ConfusionCounts, EvaluationSummary, Label, Result};
use docscore_engine::ClassifierEngine;
use std::collections::BTreeMap;
use tracing::debug;

/// Labeled documents a model is evaluated on, bounded per class
#[derive(Debug, Clone, Default)]
pub struct EvaluationSet {
    samples: BTreeMap<Label, Vec<String>>,
}

impl EvaluationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the first `sample_size` of `docs` as samples of `label`.
    ///
    /// A class with fewer documents contributes all of them.
    pub fn with_class(mut self, label: Label, docs: &[String], sample_size: usize) -> Self {
        let take = docs.len().min(sample_size);
        self.samples.insert(label, docs[..take].to_vec());
        self
    }

    pub fn samples(&self, label: Label) -> &[String] {
        self.samples.get(&label).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.samples.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Documents left for training after the evaluation sample is chosen
#[derive(Debug, Clone)]
pub struct EvaluationSplit {
    pub train_positives: Vec<String>,
    pub train_negatives: Vec<String>,
    pub evaluation: EvaluationSet,
}

/// Choose the evaluation sample for one run.
///
/// `self_consistent` samples the documents that will also be trained on.
/// `holdout` moves the first `min(sample_size, len * fraction)` documents of
/// each class out of the training data.
pub fn split_for_evaluation(
    config: &EvaluationConfig,
    positives: Vec<String>,
    negatives: Vec<String>,
) -> EvaluationSplit {
    match config.strategy {
        EvaluationStrategy::SelfConsistent => {
            let evaluation = EvaluationSet::new()
                .with_class(Label::Positive, &positives, config.sample_size)
                .with_class(Label::Negative, &negatives, config.sample_size);
            EvaluationSplit {
                train_positives: positives,
                train_negatives: negatives,
                evaluation,
            }
        }
        EvaluationStrategy::Holdout => {
            let reserve = |len: usize| {
                let share = (len as f64 * config.holdout_fraction).floor() as usize;
                share.min(config.sample_size)
            };
            let (pos_reserved, neg_reserved) = (reserve(positives.len()), reserve(negatives.len()));
            let mut positives = positives;
            let mut negatives = negatives;
            let held_pos: Vec<String> = positives.drain(..pos_reserved).collect();
            let held_neg: Vec<String> = negatives.drain(..neg_reserved).collect();

            let evaluation = EvaluationSet::new()
                .with_class(Label::Positive, &held_pos, config.sample_size)
                .with_class(Label::Negative, &held_neg, config.sample_size);
            EvaluationSplit {
                train_positives: positives,
                train_negatives: negatives,
                evaluation,
            }
        }
    }
}

/// Run every sample through `engine` and summarize.
///
/// Deterministic for a fixed set and engine; the engine is only read.
pub fn evaluate(engine: &dyn ClassifierEngine, set: &EvaluationSet) -> Result<EvaluationSummary> {
    let mut confusion = ConfusionCounts::default();
    let mut class_distribution = BTreeMap::new();
    let mut confidence_sum = 0.0f64;

    for label in Label::ALL {
        let docs = set.samples(label);
        class_distribution.insert(label.name().to_string(), docs.len());

        for doc in docs {
            let prediction = engine.predict(&normalize_text(doc))?;
            confusion.record(label, prediction.label);
            confidence_sum += prediction.confidence as f64;
        }
    }

    let total = confusion.total();
    let (accuracy, avg_confidence) = if total == 0 {
        (0.0, 0.0)
    } else {
        (
            confusion.correct() as f64 / total as f64,
            confidence_sum / total as f64,
        )
    };

    debug!(total, accuracy, avg_confidence, "Evaluated model");

    Ok(EvaluationSummary {
        accuracy,
        avg_confidence,
        num_test_samples: total,
        class_distribution,
        confusion,
    })
}
