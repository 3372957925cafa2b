//! Game server binary
//!
//! Main entry point for the Wall-E game server.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use walle_core::GameRegistry;
use walle_server::{metrics, server, Config, Metrics};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse and validate configuration before logging is set up
    let config = Config::load()?;
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level)?)
        .init();

    let registry = Arc::new(match config.game_limit() {
        Some(limit) => GameRegistry::with_limit(limit),
        None => GameRegistry::new(),
    });
    let metrics = Arc::new(Metrics::new()?);

    // Both endpoints stop on the same ctrl+c
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
        shutdown_tx.send(true).ok();
    });

    let metrics_task = match config.metrics_socket_addr()? {
        Some(metrics_addr) => {
            let listener = TcpListener::bind(metrics_addr)
                .await
                .with_context(|| format!("failed to bind metrics endpoint {}", metrics_addr))?;
            Some(tokio::spawn(metrics::serve(
                listener,
                Arc::clone(&metrics),
                shutdown_signal(shutdown_rx.clone()),
            )))
        }
        None => None,
    };

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, max_games = ?config.game_limit(), "game server starting");

    server::serve(listener, registry, metrics, shutdown_signal(shutdown_rx)).await?;
    if let Some(task) = metrics_task {
        task.await?.context("metrics endpoint failed")?;
    }

    info!("game server stopped");
    Ok(())
}

/// Resolves once shutdown has been requested
async fn shutdown_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            break;
        }
    }
}
