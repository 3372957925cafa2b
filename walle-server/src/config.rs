use std::ffi::OsString;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use serde::{Deserialize, Serialize};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Parser, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(name = "walle-server")]
#[command(about = "Wall-E board game server")]
#[command(long_about = "Hosts in-memory Wall-E board games over gRPC.

Clients create games, read the board and steer the robot with move, clean,
pick up and drop commands. Settings can also be read from a TOML file passed
with --config; flags and environment variables take precedence over it.")]
pub struct Config {
    /// Address the gRPC server listens on
    #[arg(long, env = "WALLE_SERVER_ADDR", default_value = "0.0.0.0:50051")]
    pub addr: String,

    /// Maximum number of live games (0 for unlimited)
    #[arg(long, env = "WALLE_MAX_GAMES", default_value = "0")]
    pub max_games: usize,

    /// Address of the Prometheus metrics endpoint, disabled when unset
    #[arg(long, env = "WALLE_METRICS_ADDR")]
    pub metrics_addr: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WALLE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// TOML file with default settings
    #[arg(long, env = "WALLE_CONFIG")]
    #[serde(skip)]
    pub config: Option<PathBuf>,
}

/// Settings accepted in the TOML configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    addr: Option<String>,
    max_games: Option<usize>,
    metrics_addr: Option<String>,
    log_level: Option<String>,
}

impl Config {
    /// Parse flags and environment from the current process, then fill in
    /// anything left at its default from the configuration file
    pub fn load() -> Result<Self> {
        Self::load_from(std::env::args_os())
    }

    pub fn load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let mut config = Self::from_arg_matches(&matches)?;

        if let Some(path) = config.config.clone() {
            let file = FileConfig::read(&path)?;
            config.merge_file(file, &matches);
        }

        Ok(config)
    }

    fn merge_file(&mut self, file: FileConfig, matches: &ArgMatches) {
        let explicit = |id: &str| {
            matches!(
                matches.value_source(id),
                Some(ValueSource::CommandLine | ValueSource::EnvVariable)
            )
        };

        if let Some(addr) = file.addr.filter(|_| !explicit("addr")) {
            self.addr = addr;
        }
        if let Some(max_games) = file.max_games.filter(|_| !explicit("max_games")) {
            self.max_games = max_games;
        }
        if let Some(metrics_addr) = file.metrics_addr.filter(|_| !explicit("metrics_addr")) {
            self.metrics_addr = Some(metrics_addr);
        }
        if let Some(log_level) = file.log_level.filter(|_| !explicit("log_level")) {
            self.log_level = log_level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.metrics_socket_addr()?;

        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(anyhow!(
                "log_level must be one of {}, got {:?}",
                LOG_LEVELS.join(", "),
                self.log_level
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.addr
            .parse()
            .with_context(|| format!("invalid server address {:?}", self.addr))
    }

    pub fn metrics_socket_addr(&self) -> Result<Option<SocketAddr>> {
        self.metrics_addr
            .as_deref()
            .map(|addr| {
                addr.parse()
                    .with_context(|| format!("invalid metrics address {:?}", addr))
            })
            .transpose()
    }

    /// Registry capacity, `None` when unlimited
    pub fn game_limit(&self) -> Option<usize> {
        (self.max_games > 0).then_some(self.max_games)
    }
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}
