//! Core types for the Wall-E board game server
//!
//! This crate provides everything the transport layer needs to host games:
//! - `board`: grid representation and random board generation
//! - `game`: the per-game action state machine
//! - `registry`: a thread-safe store of live games keyed by identifier

pub mod board;
pub mod game;
pub mod registry;

// Re-export main types for convenience
pub use board::{generate, Board, Cell, Position};
pub use game::{Action, Direction, Game, GameError, GameId, GameStatus};
pub use registry::{GameRegistry, GameSummary, RegistryError};
