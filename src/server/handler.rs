//! WebSocket connection handler
//!
//! Owns one connection's registry interactions and maps decoded client
//! messages to registry operations.

use std::sync::Arc;
use tracing::debug;

use super::protocol::{ClientMessage, ProtocolResult};
use crate::player::{ConnectionId, OutboundReceiver, PlayerRegistry, RespawnOutcome};

/// Handles a single connection
pub struct ConnectionHandler {
    id: ConnectionId,
    registry: Arc<PlayerRegistry>,
}

impl ConnectionHandler {
    /// Register a new connection with the registry.
    ///
    /// Returns the handler and the connection's outbound queue, which already
    /// holds the initial `map:data` and `players:init` messages.
    pub async fn open(registry: Arc<PlayerRegistry>) -> (Self, OutboundReceiver) {
        let (id, outbound) = registry.connect().await;
        (Self { id, registry }, outbound)
    }

    /// Id of this connection
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Decode a text frame and apply it
    pub async fn handle_text(&self, text: &str) -> ProtocolResult<()> {
        let message = ClientMessage::from_json(text)?;
        self.handle_message(message).await;
        Ok(())
    }

    /// Apply a decoded client message
    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::Join(request) => {
                self.registry.join(self.id, request).await;
            }
            ClientMessage::Update { position } => {
                self.registry.update(self.id, position).await;
            }
            ClientMessage::Respawn(request) => {
                if let Some(RespawnOutcome::Denied { remaining_secs }) =
                    self.registry.respawn(self.id, request).await
                {
                    debug!("Connection {} must wait {}s to respawn", self.id, remaining_secs);
                }
            }
        }
    }

    /// Deregister the connection
    pub async fn close(self) {
        self.registry.disconnect(self.id).await;
    }
}
