//! docscore Engine
//!
//! The classifier engine contract used by the service layer, and a native
//! implementation of it.
//!
//! - [`EngineBackend`] fits models from a staged corpus file and rehydrates
//!   them from durable artifacts.
//! - [`ClassifierEngine`] is a trained, read-only model answering
//!   single-best-label predictions.
//! - [`NgramBackend`] / [`NgramModel`] implement both with hashed word
//!   n-gram features and a linear classifier.

pub mod engine;
pub mod ngram;

pub use engine::{ClassifierEngine, EngineBackend, FitOutcome, Prediction};
pub use ngram::{read_corpus, CorpusExample, NgramBackend, NgramModel};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::engine::{ClassifierEngine, EngineBackend, FitOutcome, Prediction};
    pub use crate::ngram::{NgramBackend, NgramModel};
}
