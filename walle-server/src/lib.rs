//! Wall-E game server
//!
//! This crate provides the gRPC front end for the games held in a
//! [`walle_core::GameRegistry`], together with its configuration and metrics.

pub mod config;
pub mod metrics;
pub mod server;
pub mod service;

// Re-export main types
pub use config::Config;
pub use metrics::Metrics;
pub use service::GamesService;
