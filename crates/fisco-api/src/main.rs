//! # fisco-api: Binary Entry Point
//!
//! Starts the HTTP server. `PORT` selects the port (default 8080) and
//! `FISCO_RATES` points at an optional YAML rate table.

use anyhow::Context;
use fisco_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();
    let port = config.port;
    let state = AppState::from_config(config).map_err(|e| {
        tracing::error!("Configuration failed: {e}");
        e
    })?;

    let app = fisco_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Fisco API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
