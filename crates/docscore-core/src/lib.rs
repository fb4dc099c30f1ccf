//! docscore Core
//!
//! Core types and utilities shared across docscore components.
//!
//! This crate provides:
//! - Document normalization and the labeled-example line format
//! - Model identities
//! - Training hyperparameters
//! - The evaluation summary shared by the evaluator and metrics record
//! - Error types and result handling

pub mod error;
pub mod evaluation;
pub mod params;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use evaluation::{ConfusionCounts, EvaluationSummary};
pub use params::{LossKind, TrainParams};
pub use types::{normalize_document, normalize_text, Label, LabeledExample, ModelId, LABEL_PREFIX};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::params::{LossKind, TrainParams};
    pub use crate::types::{normalize_text, Label, LabeledExample, ModelId};
}
