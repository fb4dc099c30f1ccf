use anyhow::Result;
use clap::Parser;
use docscore_server::cli::{Cli, Commands, PrepareArgs, ReportArgs, ServeArgs};
use docscore_server::observability::{init_metrics, init_tracing};
use docscore_server::{build_report, create_router, prepare, AppState, PrepareOptions, ServerConfig};
use docscore_service::DocScoreService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Prepare(args) => run_prepare(args),
        Commands::Report(args) => run_report(args),
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    init_tracing(&args.logging);

    info!("Starting docscore server");

    let config = ServerConfig::load(&args.config, &args)?;
    info!("Configuration loaded successfully");
    info!("Models: {}", config.service.models_dir.display());
    info!("Metrics logs: {}", config.service.logs_dir.display());
    info!("Positive pool: {}", config.service.positive_pool.display());
    info!("Negative pool: {}", config.service.negative_pool.display());

    let metrics_handle = init_metrics()?;

    let addr: SocketAddr = format!("{}:{}", config.listen, config.port).parse()?;
    let service = DocScoreService::from_config(config.service)?;
    let state = AppState::new(Arc::new(service), config.max_upload_bytes)
        .with_metrics_handle(metrics_handle);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docscore listening on http://{}", addr);

    let shutdown = async {
        shutdown_signal().await;
        warn!("Shutdown signal received, stopping server...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn run_prepare(args: PrepareArgs) -> Result<()> {
    init_tracing(&args.logging);

    let summary = prepare(&PrepareOptions {
        input: args.input,
        output: args.output.clone(),
        limit: args.limit,
        min_words: args.min_words,
        seed: args.seed,
    })?;

    println!(
        "Scanned {} lines, kept {} documents",
        summary.scanned, summary.kept
    );
    println!(
        "Created {} positive and {} negative documents under {}",
        summary.positive,
        summary.negative,
        args.output.display()
    );
    Ok(())
}

fn run_report(args: ReportArgs) -> Result<()> {
    init_tracing(&args.logging);

    let report = build_report(&args.logs_dir, args.model.as_deref(), args.history)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &report)?;
            println!("Report written to {}", path.display());
        }
        None => print!("{}", report),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
