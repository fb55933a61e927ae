//! # keeper-api — Binary Entry Point
//!
//! Reads configuration from the environment, parses the verification key,
//! connects the object store and serves until SIGINT or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use keeper_api::config::{AppConfig, StorageBackend};
use keeper_api::state::AppState;
use keeper_storage::{GcsConfig, GcsObjectStore, MemoryObjectStore, ObjectStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Configuration error: {e}");
        e
    })?;
    tracing::info!(?config, "configuration loaded");

    let store: Arc<dyn ObjectStore> = match config.storage_backend {
        StorageBackend::Gcs => {
            let gcs = GcsObjectStore::connect(&GcsConfig {
                bucket: config.gcs_bucket.clone(),
                project_id: config.gcs_project_id.clone(),
                service_account_file: config.gcs_service_account_file.clone(),
                upload_url_ttl: config.upload_url_ttl,
            })
            .await
            .context("failed to create GCS client")?;
            Arc::new(gcs)
        }
        StorageBackend::Memory => {
            tracing::warn!("using in-memory object store; uploads are not persisted");
            Arc::new(MemoryObjectStore::new("memory", config.upload_url_ttl))
        }
    };

    let port = config.port;
    let backend = store.backend_name();
    let state = AppState::new(config, store).context("JWT_PUBLIC_KEY is not a usable RSA public key")?;
    let app = keeper_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(%addr, backend, "Keeper media service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

/// JSON logs by default; `LOG_FORMAT=pretty` for human-readable output.
/// Filter from `RUST_LOG`, defaulting to `info`.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let pretty = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("pretty"))
        .unwrap_or(false);

    if pretty {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .json()
            .with_current_span(true)
            .with_env_filter(filter)
            .init();
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
