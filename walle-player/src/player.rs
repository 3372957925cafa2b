use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::time::timeout;
use tonic::{transport::Channel, Request, Status};
use tracing::{debug, error, info, warn};
use walle_core::{Action, Direction};
use walle_proto::{
    games_client::GamesClient, ActionRequest, ActionResponse, CreateGameRequest,
    DeleteGameRequest, Direction as ProtoDirection, GameStatus as ProtoGameStatus,
};

use crate::config::Config;
use crate::policy::{Policy, RandomPolicy};

/// How an episode ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeOutcome {
    Won,
    Lost,
    /// Step limit reached with the game still in progress
    Truncated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeReport {
    pub game_id: String,
    pub steps: u32,
    pub outcome: EpisodeOutcome,
}

/// Running totals over all finished episodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub won: u32,
    pub lost: u32,
    pub truncated: u32,
    pub failed: u32,
}

impl Tally {
    fn record(&mut self, outcome: EpisodeOutcome) {
        match outcome {
            EpisodeOutcome::Won => self.won += 1,
            EpisodeOutcome::Lost => self.lost += 1,
            EpisodeOutcome::Truncated => self.truncated += 1,
        }
    }

    pub fn episodes(&self) -> u32 {
        self.won + self.lost + self.truncated + self.failed
    }
}

pub struct Player {
    config: Config,
    client: GamesClient<Channel>,
    policy: Box<dyn Policy>,
    shutdown_signal: Arc<AtomicBool>,
}

impl Player {
    pub async fn new(config: Config) -> Result<Self> {
        info!("Connecting to game server at {}", config.server_addr);
        let channel = tonic::transport::Endpoint::new(config.server_addr.clone())?
            .connect()
            .await
            .map_err(|e| anyhow!("Failed to connect to server at {}: {}", config.server_addr, e))?;

        let policy: Box<dyn Policy> = match config.seed {
            Some(seed) => Box::new(RandomPolicy::with_seed(seed)),
            None => Box::new(RandomPolicy::new()),
        };

        Ok(Self::with_parts(config, GamesClient::new(channel), policy))
    }

    pub fn with_parts(
        config: Config,
        client: GamesClient<Channel>,
        policy: Box<dyn Policy>,
    ) -> Self {
        Self {
            config,
            client,
            policy,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that stops the run loop before the next episode
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown_signal)
    }

    pub async fn run(&mut self) -> Result<Tally> {
        info!(
            "Player starting on {}x{} boards",
            self.config.width, self.config.height
        );

        let mut tally = Tally::default();
        loop {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                info!("Shutdown signal received, stopping player");
                break;
            }

            if let Some(limit) = self.config.episode_limit() {
                if tally.episodes() >= limit {
                    info!("Reached maximum episodes ({}), stopping", limit);
                    break;
                }
            }

            let episode = tally.episodes() + 1;
            match self.run_episode().await {
                Ok(report) => {
                    info!(
                        episode,
                        game_id = %report.game_id,
                        steps = report.steps,
                        outcome = ?report.outcome,
                        "episode finished"
                    );
                    tally.record(report.outcome);
                }
                Err(e) => {
                    error!("Episode {} failed: {}", episode, e);
                    tally.failed += 1;
                }
            }
        }

        info!(
            won = tally.won,
            lost = tally.lost,
            truncated = tally.truncated,
            failed = tally.failed,
            "Player stopped"
        );
        Ok(tally)
    }

    pub async fn run_episode(&mut self) -> Result<EpisodeReport> {
        let request = Request::new(CreateGameRequest {
            width: self.config.width,
            height: self.config.height,
        });
        let game_id = timeout(
            self.config.step_timeout(),
            self.client.clone().create_game(request),
        )
        .await
        .map_err(|_| anyhow!("CreateGame timed out"))?
        .map_err(|e| anyhow!("Failed to create game: {}", e))?
        .into_inner()
        .game_id;

        debug!(%game_id, "Started episode");
        let played = self.play(&game_id).await;

        // Clean up even when the episode errored part way
        if let Err(e) = self.delete_game(&game_id).await {
            warn!(%game_id, "{}", e);
        }

        let (steps, outcome) = played?;
        Ok(EpisodeReport {
            game_id,
            steps,
            outcome,
        })
    }

    async fn delete_game(&self, game_id: &str) -> Result<()> {
        let request = Request::new(DeleteGameRequest {
            game_id: game_id.to_string(),
        });
        timeout(
            self.config.step_timeout(),
            self.client.clone().delete_game(request),
        )
        .await
        .map_err(|_| anyhow!("DeleteGame timed out"))?
        .map_err(|e| anyhow!("Failed to delete game: {}", e))?;
        Ok(())
    }

    async fn play(&mut self, game_id: &str) -> Result<(u32, EpisodeOutcome)> {
        let mut carries_flower = false;

        for step in 1..=self.config.max_steps {
            let (action, direction) = self.policy.select_action(carries_flower);
            let request = ActionRequest {
                game_id: game_id.to_string(),
                direction: direction_to_proto(direction) as i32,
            };

            let response = timeout(
                self.config.step_timeout(),
                send_action(self.client.clone(), action, request),
            )
            .await
            .map_err(|_| anyhow!("{} timed out", action.name()))?
            .map_err(|e| anyhow!("Failed to {}: {}", action.name(), e))?;

            debug!(
                game_id,
                step,
                action = action.name(),
                ?direction,
                success = response.success,
                "step"
            );
            carries_flower = response.robot_carries_flower;

            match ProtoGameStatus::try_from(response.status) {
                Ok(ProtoGameStatus::Won) => return Ok((step, EpisodeOutcome::Won)),
                Ok(ProtoGameStatus::Lost) => return Ok((step, EpisodeOutcome::Lost)),
                Ok(ProtoGameStatus::InProgress) => {}
                Ok(ProtoGameStatus::Unspecified) | Err(_) => {
                    return Err(anyhow!("Server returned unknown status {}", response.status))
                }
            }
        }

        Ok((self.config.max_steps, EpisodeOutcome::Truncated))
    }
}

fn direction_to_proto(direction: Direction) -> ProtoDirection {
    match direction {
        Direction::Up => ProtoDirection::Up,
        Direction::Down => ProtoDirection::Down,
        Direction::Left => ProtoDirection::Left,
        Direction::Right => ProtoDirection::Right,
    }
}

async fn send_action(
    mut client: GamesClient<Channel>,
    action: Action,
    request: ActionRequest,
) -> Result<ActionResponse, Status> {
    let response = match action {
        Action::Move => client.move_robot(request).await?,
        Action::CleanDebris => client.clean_debris(request).await?,
        Action::PickUpFlower => client.pick_up_flower(request).await?,
        Action::DropFlower => client.drop_flower(request).await?,
    };
    Ok(response.into_inner())
}
