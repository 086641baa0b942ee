//! Server startup: wire the state together, bind, serve until ctrl-c.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;

use crate::api::{self, AppState, SharedState};
use crate::config::Config;
use crate::jobs::JobManager;
use crate::oracle::OpenAiOracle;
use crate::pipeline::Pipeline;

pub fn build_router(state: SharedState) -> Router {
    api::api_router().with_state(state)
}

pub async fn start_server(config: Config) -> Result<()> {
    std::fs::create_dir_all(&config.data_dir).with_context(|| {
        format!("Failed to create data directory {}", config.data_dir.display())
    })?;

    let config = Arc::new(config);
    let oracle = Arc::new(OpenAiOracle::new(&config)?);
    let manager = JobManager::new(config.max_concurrent_jobs);
    let pipeline = Pipeline::new(Arc::clone(&config), oracle);
    let state = Arc::new(AppState { config: Arc::clone(&config), manager, pipeline });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    let local_addr = listener.local_addr()?;
    tracing::info!(addr = %local_addr, dry_run = config.dry_run, "gantry listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutting down");
}
