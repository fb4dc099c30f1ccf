//! Classifier engine trait and common types
//!
//! The service layer only ever talks to these traits. Whatever shape an
//! engine produces natively (label strings, probability arrays, top-k lists)
//! is converted into a [`Prediction`] inside the engine's own adapter.

use docscore_core::{Error, Label, Result, TrainParams};
use std::io::{Read, Write};
use std::path::Path;

/// Rounding slack allowed on engine confidences
const CONFIDENCE_TOLERANCE: f32 = 1e-5;

/// Best label for one document and the confidence reported for it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Predicted class
    pub label: Label,

    /// Confidence for `label` only (0.0-1.0)
    pub confidence: f32,
}

impl Prediction {
    /// Create a new prediction
    pub fn new(label: Label, confidence: f32) -> Self {
        Self { label, confidence }
    }

    /// Probability that the document is positive.
    ///
    /// The engine only reports confidence for the label it picked; under the
    /// binary assumption the complement recovers the positive-class estimate.
    /// A confidence that is not finite or lies outside 0.0-1.0 (beyond float
    /// rounding) is an engine error.
    pub fn positive_probability(&self) -> Result<f32> {
        if !self.confidence.is_finite()
            || self.confidence < -CONFIDENCE_TOLERANCE
            || self.confidence > 1.0 + CONFIDENCE_TOLERANCE
        {
            return Err(Error::engine(format!(
                "confidence {} for label {} is outside 0.0-1.0",
                self.confidence,
                self.label.name()
            )));
        }
        let confidence = self.confidence.clamp(0.0, 1.0);
        Ok(match self.label {
            Label::Positive => confidence,
            Label::Negative => 1.0 - confidence,
        })
    }
}

/// A trained, queryable model
///
/// Implementations must be read-only after construction so one handle can
/// serve any number of concurrent callers.
pub trait ClassifierEngine: Send + Sync {
    /// Predict the single best label. `text` must not contain line breaks.
    fn predict(&self, text: &str) -> Result<Prediction>;

    /// Predict a batch, preserving order
    fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        texts.iter().map(|text| self.predict(text)).collect()
    }

    /// Write the serialized form of this model
    fn write_to(&self, writer: &mut dyn Write) -> Result<()>;

    /// Engine name, for logs
    fn name(&self) -> &str;
}

/// Result of fitting a model
pub struct FitOutcome {
    /// The trained model
    pub engine: Box<dyn ClassifierEngine>,

    /// Mean training loss per epoch
    pub loss_trace: Vec<f32>,

    /// Number of labeled examples consumed
    pub examples: usize,
}

impl std::fmt::Debug for FitOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FitOutcome")
            .field("engine", &self.engine.name())
            .field("loss_trace", &self.loss_trace)
            .field("examples", &self.examples)
            .finish()
    }
}

/// Trains new models and rehydrates stored ones.
///
/// Both operations are synchronous and CPU/IO bound; async callers are
/// expected to run them on a blocking thread.
pub trait EngineBackend: Send + Sync {
    /// Fit a model on a staged corpus file of `__label__<tag> <text>` lines
    fn fit(&self, corpus: &Path, params: &TrainParams) -> Result<FitOutcome>;

    /// Rebuild a model from bytes produced by [`ClassifierEngine::write_to`]
    fn load(&self, reader: &mut dyn Read) -> Result<Box<dyn ClassifierEngine>>;

    /// File extension used for durable artifacts
    fn artifact_extension(&self) -> &str {
        "model"
    }

    /// Backend name, for logs
    fn name(&self) -> &str;
}
