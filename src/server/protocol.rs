//! Protocol message definitions
//!
//! Defines the messages exchanged between browser clients and the relay.
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//!
//! Client payloads are decoded leniently: optional fields of the wrong type
//! are treated as absent so the registry can fall back to safe defaults.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

use crate::config::MapData;
use crate::player::{ConnectionId, PlayerState, Vec3};

/// Client request to become a visible participant
pub const EVENT_JOIN: &str = "player:join";
/// Position change, sent by clients and relayed by the server
pub const EVENT_UPDATE: &str = "player:update";
/// Client request to respawn
pub const EVENT_RESPAWN: &str = "player:respawn";

// ============================================================================
// Error Types
// ============================================================================

/// Protocol-related errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),
}

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

// ============================================================================
// Client Messages
// ============================================================================

/// Raw frame as received from a client
#[derive(Debug, Clone, Deserialize)]
struct ClientEnvelope {
    event: String,
    #[serde(default)]
    data: Value,
}

/// Payload of `player:join`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinRequest {
    pub name: Option<String>,
    pub spawn_index: Option<i64>,
    pub color: Option<String>,
}

/// Payload of `player:respawn`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RespawnRequest {
    pub spawn_index: Option<i64>,
    pub color: Option<String>,
}

/// Messages sent from a client to the relay
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join(JoinRequest),
    /// New position for the sender; any `id` in the payload is ignored
    Update { position: Vec3 },
    Respawn(RespawnRequest),
}

impl ClientMessage {
    /// Parse a client frame
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        let envelope: ClientEnvelope = serde_json::from_str(json)?;
        Self::from_parts(&envelope.event, &envelope.data)
    }

    fn from_parts(event: &str, data: &Value) -> ProtocolResult<Self> {
        match event {
            EVENT_JOIN => Ok(ClientMessage::Join(JoinRequest {
                name: string_field(data, "name"),
                spawn_index: index_field(data, "spawnIndex"),
                color: string_field(data, "color"),
            })),
            EVENT_UPDATE => {
                let position = data
                    .get("position")
                    .ok_or_else(|| ProtocolError::InvalidMessage("missing position".to_string()))?;
                let position: Vec3 = serde_json::from_value(position.clone())?;
                if !position.is_finite() {
                    return Err(ProtocolError::InvalidMessage(
                        "position must be finite".to_string(),
                    ));
                }
                Ok(ClientMessage::Update { position })
            }
            EVENT_RESPAWN => Ok(ClientMessage::Respawn(RespawnRequest {
                spawn_index: index_field(data, "spawnIndex"),
                color: string_field(data, "color"),
            })),
            other => Err(ProtocolError::UnknownEvent(other.to_string())),
        }
    }

    /// Event name of this message
    pub fn event(&self) -> &'static str {
        match self {
            ClientMessage::Join(_) => EVENT_JOIN,
            ClientMessage::Update { .. } => EVENT_UPDATE,
            ClientMessage::Respawn(_) => EVENT_RESPAWN,
        }
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(str::to_owned)
}

/// Integer field; fractional, string or other values count as absent
fn index_field(data: &Value, key: &str) -> Option<i64> {
    data.get(key).and_then(Value::as_i64)
}

// ============================================================================
// Server Messages
// ============================================================================

/// Non-position attributes carried by `player:meta`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerAttributes {
    pub color: String,
}

/// Messages sent from the relay to a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerMessage {
    /// Static world metadata, sent once on connect
    #[serde(rename = "map:data")]
    MapData(MapData),

    /// Snapshot of every visible player, sent once on connect
    #[serde(rename = "players:init")]
    PlayersInit(HashMap<ConnectionId, PlayerState>),

    /// Another player became visible
    #[serde(rename = "player:joined")]
    PlayerJoined { id: ConnectionId, state: PlayerState },

    /// Authoritative state of the receiving player after join or respawn
    #[serde(rename = "player:joined:you")]
    PlayerJoinedYou { id: ConnectionId, state: PlayerState },

    /// Another player moved
    #[serde(rename = "player:update")]
    PlayerUpdate { id: ConnectionId, position: Vec3 },

    /// Respawn refused; seconds until the cooldown ends
    #[serde(rename = "player:respawn:denied")]
    RespawnDenied { remaining: u64 },

    /// Another player's non-position attributes changed
    #[serde(rename = "player:meta")]
    PlayerMeta { id: ConnectionId, meta: PlayerAttributes },

    /// Another player disconnected
    #[serde(rename = "player:remove")]
    PlayerRemove { id: ConnectionId },
}

impl ServerMessage {
    /// Create a PlayerJoined message
    pub fn player_joined(id: ConnectionId, state: PlayerState) -> Self {
        ServerMessage::PlayerJoined { id, state }
    }

    /// Create a PlayerJoinedYou message
    pub fn player_joined_you(id: ConnectionId, state: PlayerState) -> Self {
        ServerMessage::PlayerJoinedYou { id, state }
    }

    /// Create a PlayerUpdate message
    pub fn player_update(id: ConnectionId, position: Vec3) -> Self {
        ServerMessage::PlayerUpdate { id, position }
    }

    /// Create a PlayerMeta message for a color change
    pub fn color_changed(id: ConnectionId, color: impl Into<String>) -> Self {
        ServerMessage::PlayerMeta {
            id,
            meta: PlayerAttributes {
                color: color.into(),
            },
        }
    }

    /// Create a PlayerRemove message
    pub fn player_remove(id: ConnectionId) -> Self {
        ServerMessage::PlayerRemove { id }
    }

    /// Serialize to a JSON frame
    pub fn to_json(&self) -> ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a server frame (primarily for clients and tests)
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
