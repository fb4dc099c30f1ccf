//! Logging and metrics setup for the binary

use crate::cli::{LogFormat, LoggingArgs};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// `DOCSCORE_LOG` takes precedence over `RUST_LOG`; `--verbose` overrides both.
pub fn init_tracing(args: &LoggingArgs) {
    let filter = if args.verbose {
        EnvFilter::new("docscore=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_env("DOCSCORE_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("docscore=info,tower_http=info"))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match args.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Install the Prometheus recorder and return the handle used by `/metrics`
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    docscore_telemetry::metrics::describe_metrics();

    info!("Metrics exporter initialized");
    Ok(handle)
}
