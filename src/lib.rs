//! Cube Relay
//!
//! Authoritative player-state relay for a browser multiplayer movement demo.
//! Tracks each connection's position, name, color and respawn eligibility and
//! fans state changes out to every other connection over WebSocket.

pub mod config;
pub mod player;
pub mod server;

pub use config::{RelayConfig, CONFIG_FILE};
pub use player::PlayerRegistry;
pub use server::{ServerConfig, WebSocketServer};
