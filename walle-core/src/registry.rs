//! Game registry mapping identifiers to live games
//!
//! The registry is an explicit value owned by the transport layer. Each game
//! sits behind its own mutex so that requests against different games never
//! contend, while requests against the same game are serialized.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use tracing::{debug, info};

use crate::game::{Game, GameError, GameId, GameStatus};

/// Shared handle to a single game
pub type GameHandle = Arc<Mutex<Game>>;

/// Errors returned by registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Game {0} not found")]
    NotFound(GameId),
    #[error("Registry is full ({limit} games)")]
    CapacityReached { limit: usize },
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Listing entry for a registered game
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameSummary {
    pub id: GameId,
    pub width: usize,
    pub height: usize,
    pub status: GameStatus,
}

#[derive(Debug)]
struct Entry {
    /// Insertion order, used to list games oldest first
    seq: u64,
    game: GameHandle,
}

/// Thread-safe store of games keyed by [`GameId`]
#[derive(Debug, Default)]
pub struct GameRegistry {
    games: RwLock<HashMap<GameId, Entry>>,
    next_seq: AtomicU64,
    max_games: Option<usize>,
}

impl GameRegistry {
    /// Create an unbounded registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that refuses new games once `max_games` are stored
    pub fn with_limit(max_games: usize) -> Self {
        Self {
            max_games: Some(max_games),
            ..Self::default()
        }
    }

    /// Generate a new game and register it
    pub fn create(&self, width: usize, height: usize) -> Result<GameId, RegistryError> {
        self.check_capacity(&self.games.read().unwrap_or_else(PoisonError::into_inner))?;
        let game = Game::new(width, height)?;
        self.insert(game)
    }

    /// Register an already constructed game
    pub fn insert(&self, game: Game) -> Result<GameId, RegistryError> {
        let mut games = self.games.write().unwrap_or_else(PoisonError::into_inner);
        self.check_capacity(&games)?;

        let id = game.id();
        let (width, height) = (game.width(), game.height());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        games.insert(
            id,
            Entry {
                seq,
                game: Arc::new(Mutex::new(game)),
            },
        );
        info!(game_id = %id, width, height, total = games.len(), "registered game");
        Ok(id)
    }

    /// Look up a game handle
    pub fn get(&self, id: &GameId) -> Option<GameHandle> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        games.get(id).map(|entry| Arc::clone(&entry.game))
    }

    /// Run `f` with exclusive access to the game
    pub fn with_game<R>(
        &self,
        id: &GameId,
        f: impl FnOnce(&mut Game) -> R,
    ) -> Result<R, RegistryError> {
        let handle = self.get(id).ok_or(RegistryError::NotFound(*id))?;
        let mut game = handle.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(f(&mut game))
    }

    /// Summaries of all games, oldest first
    pub fn list(&self) -> Vec<GameSummary> {
        let games = self.games.read().unwrap_or_else(PoisonError::into_inner);
        let mut entries: Vec<&Entry> = games.values().collect();
        entries.sort_by_key(|entry| entry.seq);

        entries
            .into_iter()
            .map(|entry| {
                let game = entry.game.lock().unwrap_or_else(PoisonError::into_inner);
                GameSummary {
                    id: game.id(),
                    width: game.width(),
                    height: game.height(),
                    status: game.status(),
                }
            })
            .collect()
    }

    /// Drop a game from the registry. Returns whether it existed.
    pub fn remove(&self, id: &GameId) -> bool {
        let removed = self
            .games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some();
        if removed {
            debug!(game_id = %id, "removed game");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.games.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_capacity(&self, games: &HashMap<GameId, Entry>) -> Result<(), RegistryError> {
        match self.max_games {
            Some(limit) if games.len() >= limit => Err(RegistryError::CapacityReached { limit }),
            _ => Ok(()),
        }
    }
}
