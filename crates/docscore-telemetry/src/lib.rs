//! docscore Telemetry
//!
//! Training run records and their persistence:
//! - [`TrainingMetrics`] and the [`RunRecorder`] that builds it
//! - JSON metrics artifacts (latest run plus append-only history)
//! - Plain-text reports
//! - Prometheus metric names shared by the service and server

pub mod metrics;
pub mod persistence;
pub mod record;
pub mod report;

pub use persistence::{write_atomic, MetricsReader, MetricsWriter, PersistenceConfig};
pub use record::{generate_run_id, CorpusStats, RunRecorder, TrainingMetrics};
pub use report::{render_history, render_summary};
