//! docscore Service
//!
//! The model lifecycle and scoring layer:
//! - [`DatasetAssembler`] builds balanced, shuffled training corpora
//! - [`ModelRegistry`] mints identities, persists artifacts, and caches loaded models
//! - [`evaluate`] measures a freshly trained model
//! - [`TrainingOrchestrator`] sequences a full training run
//! - [`ScoringService`] turns documents into positive-class probabilities
//!
//! [`DocScoreService`] wires them together from a [`ServiceConfig`].

mod blocking;
pub mod config;
pub mod dataset;
pub mod evaluator;
pub mod orchestrator;
pub mod registry;
pub mod scoring;

pub use config::{CacheConfig, EvaluationConfig, EvaluationStrategy, ServiceConfig};
pub use dataset::{DatasetAssembler, DocumentPool, PositiveSource, TrainingCorpus};
pub use evaluator::{evaluate, split_for_evaluation, EvaluationSet, EvaluationSplit};
pub use orchestrator::{TrainingOrchestrator, TrainingOutcome, TrainingRun, TrainingState};
pub use registry::{EngineHandle, ModelRegistry, ModelStore};
pub use scoring::ScoringService;

use docscore_core::{ModelId, Result, TrainParams};
use docscore_engine::{EngineBackend, NgramBackend};
use docscore_telemetry::{MetricsReader, MetricsWriter, PersistenceConfig, TrainingMetrics};
use std::sync::Arc;
use tracing::info;

/// Long-lived service handle, constructed once per process
pub struct DocScoreService {
    config: ServiceConfig,
    registry: Arc<ModelRegistry>,
    orchestrator: TrainingOrchestrator,
    scoring: ScoringService,
    metrics_reader: MetricsReader,
}

impl DocScoreService {
    /// Build with the native n-gram engine
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        Self::with_backend(config, Arc::new(NgramBackend::new()))
    }

    /// Build with a caller-supplied engine backend
    pub fn with_backend(config: ServiceConfig, backend: Arc<dyn EngineBackend>) -> Result<Self> {
        config.validate()?;

        let store = ModelStore::new(&config.models_dir, Arc::clone(&backend))?;
        let registry = Arc::new(ModelRegistry::new(store, config.cache.capacity));

        let mut assembler = DatasetAssembler::new(
            DocumentPool::new(&config.positive_pool),
            DocumentPool::new(&config.negative_pool),
        );
        if let Some(seed) = config.seed {
            assembler = assembler.with_seed(seed);
        }

        let persistence = PersistenceConfig::new(&config.logs_dir);
        let writer = Arc::new(MetricsWriter::new(persistence.clone())?);

        let mut orchestrator =
            TrainingOrchestrator::new(Arc::new(assembler), backend, Arc::clone(&registry))
                .with_metrics_writer(writer)
                .with_params(config.params.clone())
                .with_evaluation(config.evaluation.clone());
        if let Some(dir) = &config.scratch_dir {
            orchestrator = orchestrator.with_scratch_dir(dir);
        }

        info!(
            models_dir = %config.models_dir.display(),
            logs_dir = %config.logs_dir.display(),
            cache_capacity = ?config.cache.capacity,
            "docscore service initialized"
        );

        Ok(Self {
            scoring: ScoringService::new(Arc::clone(&registry)),
            metrics_reader: MetricsReader::new(persistence),
            config,
            registry,
            orchestrator,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn orchestrator(&self) -> &TrainingOrchestrator {
        &self.orchestrator
    }

    pub fn scoring(&self) -> &ScoringService {
        &self.scoring
    }

    /// Train with the configured hyperparameters
    pub async fn train(&self, source: PositiveSource) -> Result<TrainingOutcome> {
        self.orchestrator.train(source).await
    }

    /// Train with explicit hyperparameters
    pub async fn train_with_params(
        &self,
        source: PositiveSource,
        params: TrainParams,
    ) -> Result<TrainingOutcome> {
        self.orchestrator.train_with_params(source, params).await
    }

    /// Score `documents` against model `id`
    pub async fn score(&self, id: &ModelId, documents: &[String]) -> Result<Vec<f32>> {
        self.scoring.score(id, documents).await
    }

    /// Identities with a durable artifact
    pub async fn list_models(&self) -> Result<Vec<ModelId>> {
        self.registry.list_stored().await
    }

    /// Metrics of the most recent successful run
    pub fn latest_metrics(&self) -> Result<Option<TrainingMetrics>> {
        self.metrics_reader.latest()
    }

    /// Metrics of the run that produced `id`
    pub fn metrics_for(&self, id: &ModelId) -> Result<Option<TrainingMetrics>> {
        self.metrics_reader.find(id)
    }
}
