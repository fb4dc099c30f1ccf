//! Evaluation summary shared by the evaluator and the metrics record

use crate::types::Label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Binary confusion counts, positive being the class of interest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ConfusionCounts {
    /// Count one prediction
    pub fn record(&mut self, truth: Label, predicted: Label) {
        match (truth, predicted) {
            (Label::Positive, Label::Positive) => self.true_positive += 1,
            (Label::Negative, Label::Positive) => self.false_positive += 1,
            (Label::Negative, Label::Negative) => self.true_negative += 1,
            (Label::Positive, Label::Negative) => self.false_negative += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn correct(&self) -> usize {
        self.true_positive + self.true_negative
    }

    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * p * r / (p + r)
        }
    }
}

/// Post-training evaluation of one model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// matches / total
    pub accuracy: f64,

    /// Mean confidence the engine reported for its predicted labels
    pub avg_confidence: f64,

    /// Documents evaluated
    pub num_test_samples: usize,

    /// Documents per true class in the evaluation sample
    pub class_distribution: BTreeMap<String, usize>,

    /// Per-outcome counts
    #[serde(default)]
    pub confusion: ConfusionCounts,
}

impl EvaluationSummary {
    /// Precision of the positive class
    pub fn precision(&self) -> f64 {
        self.confusion.precision()
    }

    /// Recall of the positive class
    pub fn recall(&self) -> f64 {
        self.confusion.recall()
    }

    /// F1 of the positive class
    pub fn f1(&self) -> f64 {
        self.confusion.f1()
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
