//! WebSocket server module
//!
//! Handles WebSocket connections from browser clients and routes messages
//! to the player registry.

mod handler;
mod protocol;
mod websocket;

pub use handler::*;
pub use protocol::*;
pub use websocket::*;
