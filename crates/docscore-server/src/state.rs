use docscore_service::DocScoreService;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    /// Training and scoring service, constructed once at startup
    pub service: Arc<DocScoreService>,

    /// Prometheus metrics handle for rendering; absent when no recorder is installed
    pub metrics_handle: Option<PrometheusHandle>,

    /// Largest accepted request body
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(service: Arc<DocScoreService>, max_upload_bytes: usize) -> Self {
        Self {
            service,
            metrics_handle: None,
            max_upload_bytes,
        }
    }

    pub fn with_metrics_handle(mut self, handle: PrometheusHandle) -> Self {
        self.metrics_handle = Some(handle);
        self
    }
}
