//! Ant Arena Server Library
//!
//! A real-time multiplayer cellular-automaton server. Each player steers one
//! ant across a shared toroidal grid with a personal rule set; the server runs
//! the simulation and keeps every WebSocket client in sync.
//!
//! # Features
//!
//! - `ratelimit` - Per-connection fixed-window message rate limiting (enabled by default)

pub mod config;
pub mod game;
pub mod metrics;
pub mod net;

pub use config::{GameConfig, ServerConfig};
pub use game::engine::{EngineError, GameEngine};
pub use net::transport::GameServer;
