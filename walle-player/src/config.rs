use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use walle_core::game::{MAX_DIMENSION, MIN_DIMENSION};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "walle-player")]
#[command(about = "Wall-E random player")]
#[command(long_about = "Plays Wall-E games against a running game server.

Each episode creates a fresh game, issues random robot commands until the
game is won, lost or the step limit is hit, then deletes the game.")]
pub struct Config {
    /// Game server address
    #[arg(long, env = "WALLE_PLAYER_SERVER_ADDR", default_value = "http://localhost:50051")]
    pub server_addr: String,

    /// Board width for new games
    #[arg(long, env = "WALLE_PLAYER_WIDTH", default_value = "10")]
    pub width: u32,

    /// Board height for new games
    #[arg(long, env = "WALLE_PLAYER_HEIGHT", default_value = "10")]
    pub height: u32,

    /// Maximum episodes to run (-1 for unlimited)
    #[arg(long, env = "WALLE_PLAYER_MAX_EPISODES", default_value = "-1", allow_hyphen_values = true)]
    pub max_episodes: i32,

    /// Actions issued per episode before giving up
    #[arg(long, env = "WALLE_PLAYER_MAX_STEPS", default_value = "500")]
    pub max_steps: u32,

    /// Timeout per request in seconds
    #[arg(long, env = "WALLE_PLAYER_STEP_TIMEOUT", default_value = "5")]
    pub step_timeout_secs: u64,

    /// Policy seed, random when unset
    #[arg(long, env = "WALLE_PLAYER_SEED")]
    pub seed: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WALLE_PLAYER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.is_empty() {
            return Err(anyhow!("server_addr cannot be empty"));
        }

        let valid = |side: u32| (MIN_DIMENSION..=MAX_DIMENSION).contains(&(side as usize));
        if !valid(self.width) || !valid(self.height) {
            return Err(anyhow!(
                "board dimensions must be between {} and {}, got {}x{}",
                MIN_DIMENSION,
                MAX_DIMENSION,
                self.width,
                self.height
            ));
        }

        if self.max_steps == 0 {
            return Err(anyhow!("max_steps must be greater than 0"));
        }

        if self.step_timeout_secs == 0 {
            return Err(anyhow!("step_timeout_secs must be greater than 0"));
        }

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(anyhow!("log_level must be one of {}", LOG_LEVELS.join(", ")));
        }

        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Episode limit, `None` when unlimited
    pub fn episode_limit(&self) -> Option<u32> {
        u32::try_from(self.max_episodes).ok().filter(|&n| n > 0)
    }
}
