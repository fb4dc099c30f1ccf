//! Request-time scoring

use crate::blocking::run_blocking;
use crate::registry::ModelRegistry;
use docscore_core::{normalize_document, Error, ModelId, Result};
use docscore_engine::Prediction;
use docscore_telemetry::metrics::{DOCUMENTS_SCORED_TOTAL, SCORE_REQUESTS_TOTAL};
use std::sync::Arc;
use tracing::debug;

/// Scores documents against stored models
#[derive(Clone)]
pub struct ScoringService {
    registry: Arc<ModelRegistry>,
}

impl ScoringService {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Positive-class probability for each document, in input order.
    ///
    /// An unknown `id` fails with `ModelNotFound`. A document that is blank
    /// after normalization fails the whole request with `InvalidDocument`.
    pub async fn score(&self, id: &ModelId, documents: &[String]) -> Result<Vec<f32>> {
        metrics::counter!(SCORE_REQUESTS_TOTAL).increment(1);

        let engine = self.registry.resolve(id).await?;

        let normalized = documents
            .iter()
            .enumerate()
            .map(|(index, doc)| {
                normalize_document(doc)
                    .ok_or_else(|| Error::invalid_document(index, "document is empty after normalization"))
            })
            .collect::<Result<Vec<String>>>()?;

        if normalized.is_empty() {
            return Ok(Vec::new());
        }

        let count = normalized.len();
        let scores = run_blocking(move || {
            let texts: Vec<&str> = normalized.iter().map(String::as_str).collect();
            let predictions = engine.predict_batch(&texts)?;
            if predictions.len() != texts.len() {
                return Err(Error::engine(format!(
                    "engine returned {} predictions for {} documents",
                    predictions.len(),
                    texts.len()
                )));
            }
            predictions
                .iter()
                .map(Prediction::positive_probability)
                .collect::<Result<Vec<f32>>>()
        })
        .await?;

        metrics::counter!(DOCUMENTS_SCORED_TOTAL).increment(count as u64);
        debug!(model_id = %id, documents = count, "Scored documents");
        Ok(scores)
    }
}
