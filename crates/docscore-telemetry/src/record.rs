//! Training metrics record
//!
//! One [`TrainingMetrics`] is produced per successful training run and is
//! never mutated afterwards. [`RunRecorder`] accumulates the pieces while the
//! run is in flight and logs each one as it arrives.

use chrono::{DateTime, Utc};
use docscore_core::{Error, EvaluationSummary, ModelId, Result, TrainParams};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Class counts of the assembled training corpus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusStats {
    pub positive: usize,
    pub negative: usize,
}

impl CorpusStats {
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

/// Complete record of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    /// Run identifier, also used as the tracing span field
    pub run_id: String,

    /// Identity of the model this run produced
    pub model_id: ModelId,

    /// Hyperparameters used
    pub model_params: TrainParams,

    /// Mean loss per epoch
    pub train_loss: Vec<f32>,

    /// Post-training evaluation
    pub eval_metrics: EvaluationSummary,

    /// Training corpus class counts
    pub corpus: CorpusStats,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl TrainingMetrics {
    /// Loss of the last epoch, if any
    pub fn final_loss(&self) -> Option<f32> {
        self.train_loss.last().copied()
    }
}

/// Generate a unique run ID using UUID v4
pub fn generate_run_id() -> String {
    format!("run_{}", uuid::Uuid::new_v4().simple())
}

/// Accumulates the parts of a [`TrainingMetrics`] during a run
#[derive(Debug)]
pub struct RunRecorder {
    run_id: String,
    started_at: DateTime<Utc>,
    started: Instant,
    params: Option<TrainParams>,
    train_loss: Vec<f32>,
    corpus: CorpusStats,
    eval: Option<EvaluationSummary>,
}

impl RunRecorder {
    /// Start recording a new run
    pub fn new() -> Self {
        Self::with_run_id(generate_run_id())
    }

    /// Start recording under a caller-chosen run id
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            started: Instant::now(),
            params: None,
            train_loss: Vec::new(),
            corpus: CorpusStats::default(),
            eval: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Record the hyperparameters the run will use
    pub fn log_training_start(&mut self, params: &TrainParams) {
        info!(
            run_id = %self.run_id,
            params = %serde_json::to_string(params).unwrap_or_default(),
            "Training started"
        );
        self.params = Some(params.clone());
    }

    /// Record the corpus class counts
    pub fn log_corpus(&mut self, corpus: CorpusStats) {
        info!(
            run_id = %self.run_id,
            positive = corpus.positive,
            negative = corpus.negative,
            "Training corpus assembled"
        );
        self.corpus = corpus;
    }

    /// Record the loss of one epoch (1-based)
    pub fn log_epoch(&mut self, epoch: usize, loss: f32) {
        info!(run_id = %self.run_id, epoch, loss, "Epoch complete");
        self.train_loss.push(loss);
    }

    /// Record a full loss trace
    pub fn log_loss_trace(&mut self, trace: &[f32]) {
        for (i, loss) in trace.iter().enumerate() {
            self.log_epoch(i + 1, *loss);
        }
    }

    /// Record the evaluation summary
    pub fn log_evaluation(&mut self, summary: &EvaluationSummary) {
        info!(
            run_id = %self.run_id,
            accuracy = summary.accuracy,
            avg_confidence = summary.avg_confidence,
            samples = summary.num_test_samples,
            "Evaluation complete"
        );
        self.eval = Some(summary.clone());
    }

    /// Seal the record for a run that produced `model_id`
    pub fn finish(self, model_id: ModelId) -> Result<TrainingMetrics> {
        let model_params = self
            .params
            .ok_or_else(|| Error::internal("run finished without hyperparameters"))?;
        let eval_metrics = self
            .eval
            .ok_or_else(|| Error::internal("run finished without evaluation"))?;

        Ok(TrainingMetrics {
            run_id: self.run_id,
            model_id,
            model_params,
            train_loss: self.train_loss,
            eval_metrics,
            corpus: self.corpus,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: self.started.elapsed().as_millis() as u64,
        })
    }
}

impl Default for RunRecorder {
    fn default() -> Self {
        Self::new()
    }
}
