//! growmate-predictor - Prediction service
//!
//! Serves `POST /predict` from the latest published model artifact.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use growmate_common::config::GrowmateConfig;
use growmate_common::storage::FsBlobStore;
use growmate_predictor::{build_router, AppState, ModelCache};
use tokio::signal;
use tracing::{error, info};

const DEFAULT_PORT: u16 = 5781;

/// Command-line arguments for growmate-predictor
#[derive(Parser, Debug)]
#[command(name = "growmate-predictor")]
#[command(about = "Serves GrowMate watering-duration predictions")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "GROWMATE_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "GROWMATE_PREDICTOR_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GROWMATE_PREDICTOR_PORT")]
    port: Option<u16>,
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
        "Starting GrowMate predictor v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let storage_root = config.storage_root();
    let store = FsBlobStore::open(&storage_root, &config.storage.bucket)
        .context("Failed to open model storage")?;
    info!("✓ Model bucket: {}", store.bucket_dir().display());

    let cache = ModelCache::new(
        Arc::new(store),
        config.storage.artifact_key.clone(),
        Duration::from_secs(config.serving.refresh_interval_secs),
    );
    cache.load_initial().await;

    let app = build_router(AppState::new(cache));

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or_else(|| config.port_or(DEFAULT_PORT));
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("growmate-predictor listening on http://{}", addr);
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
