//! Reversi Engine - authoritative game server.

use anyhow::Result;
use clap::Parser;
use reversi_engine::cli::{Cli, Command};
use reversi_engine::{GameManager, run_tick_loop, serve};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            host,
            tick_interval_ms,
        } => run_server(host, port, tick_interval_ms).await,
    }
}

/// Run the HTTP game server with its tick scheduler.
async fn run_server(host: String, port: u16, tick_interval_ms: u64) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(port, "Starting Reversi Engine server");

    let manager = Arc::new(GameManager::new());
    tokio::spawn(run_tick_loop(
        manager.clone(),
        Duration::from_millis(tick_interval_ms),
    ));

    serve(manager, &host, port).await?;
    Ok(())
}
