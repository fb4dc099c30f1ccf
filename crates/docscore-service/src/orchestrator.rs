//! Training orchestration
//!
//! One run walks `Idle -> Assembling -> Fitting -> Persisting -> Evaluating
//! -> Done`. Any failure moves it to `Failed`; there is no partial success.

use crate::blocking::run_blocking;
use crate::config::EvaluationConfig;
use crate::dataset::{DatasetAssembler, PositiveSource};
use crate::evaluator::{evaluate, split_for_evaluation};
use crate::registry::{EngineHandle, ModelRegistry};
use docscore_core::{Error, Label, ModelId, Result, TrainParams};
use docscore_engine::EngineBackend;
use docscore_telemetry::metrics::{TRAIN_DURATION_MS, TRAIN_RUNS_TOTAL};
use docscore_telemetry::{generate_run_id, CorpusStats, MetricsWriter, RunRecorder, TrainingMetrics};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Lifecycle state of one training run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    Idle,
    Assembling,
    Fitting,
    Persisting,
    Evaluating,
    Done,
    Failed,
}

impl TrainingState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrainingState::Done | TrainingState::Failed)
    }

    /// Whether `next` is a legal successor of `self`
    pub fn can_transition_to(&self, next: TrainingState) -> bool {
        use TrainingState::*;
        match (self, next) {
            (s, Failed) => !s.is_terminal(),
            (Idle, Assembling)
            | (Assembling, Fitting)
            | (Fitting, Persisting)
            | (Persisting, Evaluating)
            | (Evaluating, Done) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrainingState::Idle => "idle",
            TrainingState::Assembling => "assembling",
            TrainingState::Fitting => "fitting",
            TrainingState::Persisting => "persisting",
            TrainingState::Evaluating => "evaluating",
            TrainingState::Done => "done",
            TrainingState::Failed => "failed",
        }
    }
}

/// State tracker for one run
#[derive(Debug, Clone)]
pub struct TrainingRun {
    run_id: String,
    state: TrainingState,
    history: Vec<TrainingState>,
    stored_model: Option<ModelId>,
}

impl TrainingRun {
    pub fn new(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            state: TrainingState::Idle,
            history: vec![TrainingState::Idle],
            stored_model: None,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[TrainingState] {
        &self.history
    }

    /// Identity persisted by this run, once the artifact is durable
    pub fn stored_model(&self) -> Option<ModelId> {
        self.stored_model
    }

    /// Note that the artifact for `id` has been persisted
    pub fn record_stored(&mut self, id: ModelId) {
        self.stored_model = Some(id);
    }

    /// Move to `next`, rejecting illegal transitions
    pub fn advance(&mut self, next: TrainingState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(Error::internal(format!(
                "illegal training transition {} -> {}",
                self.state.as_str(),
                next.as_str()
            )));
        }
        debug!(run_id = %self.run_id, from = self.state.as_str(), to = next.as_str(), "Training state");
        self.state = next;
        self.history.push(next);
        Ok(())
    }

    /// Mark the run failed; a no-op once terminal
    pub fn fail(&mut self) {
        if !self.state.is_terminal() {
            self.state = TrainingState::Failed;
            self.history.push(TrainingState::Failed);
        }
    }
}

/// Result of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    pub model_id: ModelId,
    pub metrics: TrainingMetrics,
}

/// Sequences assembly, fitting, persistence, and evaluation
pub struct TrainingOrchestrator {
    assembler: Arc<DatasetAssembler>,
    backend: Arc<dyn EngineBackend>,
    registry: Arc<ModelRegistry>,
    metrics_writer: Option<Arc<MetricsWriter>>,
    params: TrainParams,
    evaluation: EvaluationConfig,
    scratch_dir: Option<PathBuf>,
}

impl TrainingOrchestrator {
    pub fn new(
        assembler: Arc<DatasetAssembler>,
        backend: Arc<dyn EngineBackend>,
        registry: Arc<ModelRegistry>,
    ) -> Self {
        Self {
            assembler,
            backend,
            registry,
            metrics_writer: None,
            params: TrainParams::default(),
            evaluation: EvaluationConfig::default(),
            scratch_dir: None,
        }
    }

    /// Persist a metrics artifact after every successful run
    pub fn with_metrics_writer(mut self, writer: Arc<MetricsWriter>) -> Self {
        self.metrics_writer = Some(writer);
        self
    }

    /// Hyperparameters used by [`train`](Self::train)
    pub fn with_params(mut self, params: TrainParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_evaluation(mut self, evaluation: EvaluationConfig) -> Self {
        self.evaluation = evaluation;
        self
    }

    /// Stage corpora under `dir` instead of the OS temp dir
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn params(&self) -> &TrainParams {
        &self.params
    }

    /// Train with the configured hyperparameters
    pub async fn train(&self, source: PositiveSource) -> Result<TrainingOutcome> {
        self.train_with_params(source, self.params.clone()).await
    }

    /// Train with explicit hyperparameters
    pub async fn train_with_params(
        &self,
        source: PositiveSource,
        params: TrainParams,
    ) -> Result<TrainingOutcome> {
        let mut run = TrainingRun::new(generate_run_id());
        let span = info_span!("train", run_id = %run.run_id());
        let started = Instant::now();

        let result = self.execute(&mut run, source, params).instrument(span).await;

        match &result {
            Ok(outcome) => {
                metrics::counter!(TRAIN_RUNS_TOTAL, "outcome" => "success").increment(1);
                metrics::histogram!(TRAIN_DURATION_MS).record(started.elapsed().as_millis() as f64);
                info!(
                    run_id = %run.run_id(),
                    model_id = %outcome.model_id,
                    accuracy = outcome.metrics.eval_metrics.accuracy,
                    "Training completed"
                );
            }
            Err(e) => {
                let failed_in = run.state();
                run.fail();
                metrics::counter!(TRAIN_RUNS_TOTAL, "outcome" => "failure").increment(1);
                error!(
                    run_id = %run.run_id(),
                    stage = failed_in.as_str(),
                    kind = e.kind().as_str(),
                    error = %e,
                    "Training failed"
                );
                // The artifact stays stored and scoreable, but no caller learns its id.
                if let Some(orphan) = run.stored_model() {
                    error!(
                        run_id = %run.run_id(),
                        model_id = %orphan,
                        "Model persisted by failed run was not returned"
                    );
                }
            }
        }

        result
    }

    async fn execute(
        &self,
        run: &mut TrainingRun,
        source: PositiveSource,
        params: TrainParams,
    ) -> Result<TrainingOutcome> {
        let mut recorder = RunRecorder::with_run_id(run.run_id());

        run.advance(TrainingState::Assembling)?;
        params.validate()?;
        let assembler = Arc::clone(&self.assembler);
        let evaluation = self.evaluation.clone();
        let (corpus, eval_set) = run_blocking(move || {
            let positives = assembler.resolve_positives(source)?;
            let negatives = assembler.load_negatives()?;
            let split = split_for_evaluation(&evaluation, positives, negatives);
            let corpus = assembler.assemble_documents(split.train_positives, split.train_negatives)?;
            Ok((corpus, split.evaluation))
        })
        .await?;
        recorder.log_corpus(CorpusStats {
            positive: corpus.count(Label::Positive),
            negative: corpus.count(Label::Negative),
        });

        run.advance(TrainingState::Fitting)?;
        recorder.log_training_start(&params);
        let backend = Arc::clone(&self.backend);
        let scratch = self.scratch_dir.clone();
        let fit_params = params.clone();
        let fitted = run_blocking(move || {
            // Dropping the staged file removes it, success or failure.
            let staged = corpus.stage(scratch.as_deref())?;
            backend.fit(staged.path(), &fit_params)
        })
        .await?;
        info!(
            backend = self.backend.name(),
            examples = fitted.examples,
            epochs = fitted.loss_trace.len(),
            "Model fitted"
        );
        recorder.log_loss_trace(&fitted.loss_trace);

        run.advance(TrainingState::Persisting)?;
        let handle: EngineHandle = Arc::from(fitted.engine);
        let model_id = self.registry.store_handle(Arc::clone(&handle)).await?;
        run.record_stored(model_id);

        run.advance(TrainingState::Evaluating)?;
        let summary = run_blocking(move || evaluate(handle.as_ref(), &eval_set)).await?;
        recorder.log_evaluation(&summary);

        let metrics = recorder.finish(model_id)?;
        if let Some(writer) = &self.metrics_writer {
            let writer = Arc::clone(writer);
            let record = metrics.clone();
            // The model is already durable; a lost metrics artifact does not undo it.
            if let Err(e) = run_blocking(move || writer.write(&record)).await {
                warn!(model_id = %model_id, error = %e, "Failed to write metrics artifact");
            }
        }

        run.advance(TrainingState::Done)?;
        Ok(TrainingOutcome { model_id, metrics })
    }
}
