//! # savania-api — Binary Entry Point
//!
//! Starts the Axum HTTP server for the SAVANIA back-office.
//! Configuration comes from the environment; see [`AppConfig::from_env`].

use std::sync::Arc;

use savania_api::state::LogFormat;
use savania_api::{AppConfig, AppState};
use savania_store::{MemoryIdentity, MemoryStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    let store = match &config.seed {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                tracing::error!(path = %path.display(), "cannot read seed snapshot: {e}");
                e
            })?;
            let store = MemoryStore::from_snapshot(serde_json::from_str(&raw)?)?;
            tracing::info!(path = %path.display(), "store seeded from snapshot");
            store
        }
        None => MemoryStore::new(),
    };

    tracing::info!(?config, "configuration loaded");
    let port = config.port;
    let state = AppState::from_parts(Arc::new(store), Arc::new(MemoryIdentity::new()), config);
    let app = savania_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("SAVANIA API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
