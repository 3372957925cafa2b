use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod player;
mod policy;

use crate::config::Config;
use crate::player::Player;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Validate configuration
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level)?)
        .init();

    info!(
        "Starting player against {} (seed {:?})",
        config.server_addr, config.seed
    );

    let mut player = Player::new(config).await?;

    // Setup graceful shutdown
    let shutdown_flag = player.shutdown_handle();
    let shutdown_handle = tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, finishing current episode...");
                shutdown_flag.store(true, Ordering::SeqCst);
            }
            Err(e) => error!("Failed to listen for ctrl+c: {}", e),
        }
    });

    let run_result = player.run().await;
    shutdown_handle.abort();

    match run_result {
        Ok(tally) => {
            info!(
                "Player completed {} episodes ({} won)",
                tally.episodes(),
                tally.won
            );
            Ok(())
        }
        Err(e) => {
            error!("Player failed: {}", e);
            Err(e)
        }
    }
}
