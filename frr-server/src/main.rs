//! F1 Race Replay Server
//!
//! Hosts one race replay behind a REST API and an SSE frame stream

use anyhow::{Context, Result};
use frr_adapters::{CacheProvider, DemoProvider};
use frr_server::{api, config::ServerConfig, state};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting F1 Race Replay Server");

    let config = ServerConfig::from_env().context("Invalid server configuration")?;

    // Create application state
    let state = state::AppState::from_config(&config);

    state.register_provider(Arc::new(DemoProvider::new())).await;
    if config.data_dir.is_dir() {
        state
            .register_provider(Arc::new(CacheProvider::new(&config.data_dir)))
            .await;
    } else {
        warn!(
            "Cache directory {} not found; only the demo race is available",
            config.data_dir.display()
        );
    }

    // Build the router
    let app = api::create_router(state);

    // Start server
    info!("Server listening on http://{}", config.bind);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    axum::serve(listener, app).await?;

    Ok(())
}
