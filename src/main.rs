//! MySQL Studio server entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use mysql_studio_lib::config::ServerConfig;
use mysql_studio_lib::engine::drivers::mysql::MySqlDriver;
use mysql_studio_lib::observability;
use mysql_studio_lib::server::{Router, Server};
use mysql_studio_lib::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let dotenv = dotenvy::dotenv();

    let config = ServerConfig::parse();
    let _log_guard = observability::init_tracing(&config.log_settings());
    if let Ok(path) = dotenv {
        info!("Loaded environment from {}", path.display());
    }

    let addr = config.bind_addr().context("Invalid bind address")?;
    let driver = Arc::new(MySqlDriver::with_connect_timeout(config.connect_timeout()));
    let state = AppState::new(config, driver);

    if !state.ai.status().has_key {
        warn!("DEEPSEEK_API_KEY is not set; AI endpoints will report a missing key");
    }
    let sweeper = state.session_manager.spawn_idle_sweeper();

    let router = Router::new(state).context("Failed to build route table")?;
    let server = Server::bind(addr, router)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    server.serve_until(shutdown_signal()).await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
