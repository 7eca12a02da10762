//! growmate-trainer - Retrain service
//!
//! Serves `POST /retrain`, or with `--once` runs a single retrain and prints
//! the report as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use growmate_common::config::GrowmateConfig;
use growmate_common::storage::FsBlobStore;
use growmate_trainer::pipeline::publisher::{Publisher, ReloadNotifier};
use growmate_trainer::pipeline::reconciler::reconciler_for;
use growmate_trainer::{build_router, sources, AppState, RetrainPipeline};
use tokio::signal;
use tracing::{error, info};

const DEFAULT_PORT: u16 = 5780;

/// Command-line arguments for growmate-trainer
#[derive(Parser, Debug)]
#[command(name = "growmate-trainer")]
#[command(about = "Retrains and publishes the GrowMate watering-duration model")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "GROWMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "GROWMATE_TRAINER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GROWMATE_TRAINER_PORT")]
    port: Option<u16>,

    /// Run one retrain, print the report and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = GrowmateConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .init();

    info!(
        "Starting GrowMate trainer v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let credential = config
        .database
        .load_credential()
        .context("Failed to load database credential")?;

    let database_url = config.database_url();
    let source = sources::open_source(&database_url, credential)
        .await
        .with_context(|| format!("Failed to open log source {}", database_url))?;
    info!("✓ Log source: {}", source.describe());

    let storage_root = config.storage_root();
    let store = FsBlobStore::open(&storage_root, &config.storage.bucket)
        .context("Failed to open model storage")?;
    info!("✓ Model bucket: {}", store.bucket_dir().display());

    let publisher = Publisher::new(Arc::new(store), config.storage.artifact_key.clone());
    let mut pipeline = RetrainPipeline::new(
        source,
        reconciler_for(config.database.reconcile_mode),
        publisher,
        config.database.clone(),
        config.training.clone(),
    );
    if let Some(url) = &config.serving.notify_url {
        pipeline = pipeline.with_notifier(ReloadNotifier::new(url.clone())?);
        info!("Predictor reload notifications: {}", url);
    }

    if args.once {
        let report = pipeline.run().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let app = build_router(AppState::new(pipeline));

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or_else(|| config.port_or(DEFAULT_PORT));
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("growmate-trainer listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
