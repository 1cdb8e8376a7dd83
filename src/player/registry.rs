//! Player registry for coordinating all connections
//!
//! Maintains the authoritative map of live connections to their public state
//! and fans out state-change events to the other connections.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use super::clock::{Clock, SystemClock};
use super::state::{
    default_name, normalize_color, random_color, resolve_color, resolve_name, select_spawn,
    ConnectionId, PlayerState, Vec3,
};
use crate::config::{JoinPolicy, MapData, RelayConfig};
use crate::server::{JoinRequest, RespawnRequest, ServerMessage};

/// Queue of messages waiting to be written to one connection
pub type Outbound = mpsc::UnboundedSender<ServerMessage>;

/// Receiving half of a connection's outbound queue
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Result of a respawn request
#[derive(Debug, Clone, PartialEq)]
pub enum RespawnOutcome {
    /// Respawn granted with the new authoritative state
    Accepted(PlayerState),
    /// Cooldown still running; whole seconds remaining, rounded up
    Denied { remaining_secs: u64 },
}

/// A live connection
struct Connection {
    outbound: Outbound,
    /// `None` until the connection joins
    player: Option<PlayerState>,
    /// Clock time of the last granted respawn
    last_respawn_at: Option<u64>,
}

impl Connection {
    fn send(&self, message: ServerMessage) {
        // A closed queue means the connection task is exiting and will
        // deregister shortly.
        let _ = self.outbound.send(message);
    }
}

struct Inner {
    connections: HashMap<ConnectionId, Connection>,
    rng: StdRng,
}

impl Inner {
    /// Queue `message` for every connection except `except`
    fn broadcast_except(&self, except: ConnectionId, message: &ServerMessage) -> usize {
        let mut delivered = 0;
        for (id, connection) in &self.connections {
            if *id != except {
                connection.send(message.clone());
                delivered += 1;
            }
        }
        delivered
    }

    fn snapshot(&self) -> HashMap<ConnectionId, PlayerState> {
        self.connections
            .iter()
            .filter_map(|(id, c)| c.player.clone().map(|state| (*id, state)))
            .collect()
    }
}

/// Registry of all live connections
///
/// The registry is the single owner of shared player state. Every operation
/// takes the write lock for its read-modify-write and queues notifications on
/// the recipients' unbounded outbound channels before releasing it, so each
/// recipient observes events in mutation order and a slow peer never blocks
/// the registry.
pub struct PlayerRegistry {
    inner: RwLock<Inner>,
    map: MapData,
    join_policy: JoinPolicy,
    default_position: Vec3,
    clock: Arc<dyn Clock>,
}

impl PlayerRegistry {
    /// Create a registry with the system clock and an entropy-seeded RNG
    pub fn new(config: &RelayConfig) -> Self {
        Self::with_parts(config, Arc::new(SystemClock::new()), StdRng::from_entropy())
    }

    /// Create a registry with an explicit clock and random source
    pub fn with_parts(config: &RelayConfig, clock: Arc<dyn Clock>, rng: StdRng) -> Self {
        Self {
            inner: RwLock::new(Inner {
                connections: HashMap::new(),
                rng,
            }),
            map: config.map_data(),
            join_policy: config.join_policy,
            default_position: config.default_position,
            clock,
        }
    }

    /// Static map data served to each connection
    pub fn map_data(&self) -> &MapData {
        &self.map
    }

    /// Register a new connection.
    ///
    /// The newcomer is sent `map:data` followed by a `players:init` snapshot.
    /// Under [`JoinPolicy::Immediate`] it is also given a default state,
    /// announced to the others and told its own state.
    pub async fn connect(&self) -> (ConnectionId, OutboundReceiver) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.register(id, outbound).await;
        (id, receiver)
    }

    async fn register(&self, id: ConnectionId, outbound: Outbound) {
        let mut inner = self.inner.write().await;

        let _ = outbound.send(ServerMessage::MapData(self.map.clone()));
        let _ = outbound.send(ServerMessage::PlayersInit(inner.snapshot()));

        let player = match self.join_policy {
            JoinPolicy::OnJoin => None,
            JoinPolicy::Immediate => Some(PlayerState {
                position: self.default_position,
                name: default_name(&id),
                color: random_color(&mut inner.rng),
            }),
        };

        if let Some(state) = &player {
            inner.broadcast_except(id, &ServerMessage::player_joined(id, state.clone()));
            let _ = outbound.send(ServerMessage::player_joined_you(id, state.clone()));
        }

        inner.connections.insert(
            id,
            Connection {
                outbound,
                player,
                last_respawn_at: None,
            },
        );

        info!(
            "Connection {} registered ({} live)",
            id,
            inner.connections.len()
        );
    }

    /// Remove a connection and tell the others.
    ///
    /// Returns false if `id` was not registered, in which case nothing is sent.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let mut inner = self.inner.write().await;

        if inner.connections.remove(&id).is_none() {
            return false;
        }

        inner.broadcast_except(id, &ServerMessage::player_remove(id));
        info!(
            "Connection {} removed ({} live)",
            id,
            inner.connections.len()
        );
        true
    }

    /// Deliver `message` to every connection except `id`
    pub async fn broadcast_except(&self, id: ConnectionId, message: ServerMessage) -> usize {
        self.inner.read().await.broadcast_except(id, &message)
    }

    /// Make a connection a visible, named, positioned, colored player.
    ///
    /// Returns the assigned state, or `None` if `id` is not a live connection.
    pub async fn join(&self, id: ConnectionId, request: JoinRequest) -> Option<PlayerState> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let connection = inner.connections.get_mut(&id)?;

        let state = PlayerState {
            position: select_spawn(&self.map.spawn_points, request.spawn_index, &mut inner.rng),
            name: resolve_name(request.name.as_deref(), &id),
            color: resolve_color(request.color.as_deref(), &mut inner.rng),
        };
        connection.player = Some(state.clone());

        inner.broadcast_except(id, &ServerMessage::player_joined(id, state.clone()));
        if let Some(connection) = inner.connections.get(&id) {
            connection.send(ServerMessage::player_joined_you(id, state.clone()));
        }

        info!("Player {} joined as '{}' ({})", id, state.name, state.color);
        Some(state)
    }

    /// Overwrite a player's position and relay it to the others.
    ///
    /// Returns false, with nothing sent, if `id` has not joined.
    pub async fn update(&self, id: ConnectionId, position: Vec3) -> bool {
        let mut inner = self.inner.write().await;

        let Some(player) = inner
            .connections
            .get_mut(&id)
            .and_then(|c| c.player.as_mut())
        else {
            debug!("Dropping update from {} before join", id);
            return false;
        };

        player.position = position;
        inner.broadcast_except(id, &ServerMessage::player_update(id, position));
        true
    }

    /// Move a player to a spawn point, subject to the respawn cooldown.
    ///
    /// Returns `None` if `id` has not joined.
    pub async fn respawn(
        &self,
        id: ConnectionId,
        request: RespawnRequest,
    ) -> Option<RespawnOutcome> {
        let now = self.clock.now_ms();
        let cooldown = self.map.respawn_cooldown_ms;

        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let connection = inner.connections.get_mut(&id)?;
        let player = connection.player.as_mut()?;

        if let Some(last) = connection.last_respawn_at {
            let elapsed = now.saturating_sub(last);
            if elapsed < cooldown {
                let remaining_secs = (cooldown - elapsed).div_ceil(1000);
                connection.send(ServerMessage::RespawnDenied {
                    remaining: remaining_secs,
                });
                debug!("Respawn for {} denied, {}s remaining", id, remaining_secs);
                return Some(RespawnOutcome::Denied { remaining_secs });
            }
        }

        player.position =
            select_spawn(&self.map.spawn_points, request.spawn_index, &mut inner.rng);
        let new_color = request
            .color
            .as_deref()
            .and_then(normalize_color)
            .filter(|color| *color != player.color);
        if let Some(color) = &new_color {
            player.color = color.clone();
        }
        let state = player.clone();
        connection.last_respawn_at = Some(now);
        connection.send(ServerMessage::player_joined_you(id, state.clone()));

        inner.broadcast_except(id, &ServerMessage::player_update(id, state.position));
        if let Some(color) = new_color {
            inner.broadcast_except(id, &ServerMessage::color_changed(id, color));
        }

        debug!("Player {} respawned at {:?}", id, state.position);
        Some(RespawnOutcome::Accepted(state))
    }

    /// Public state of every joined player
    pub async fn snapshot(&self) -> HashMap<ConnectionId, PlayerState> {
        self.inner.read().await.snapshot()
    }

    /// State of one player, if joined
    pub async fn player(&self, id: ConnectionId) -> Option<PlayerState> {
        self.inner
            .read()
            .await
            .connections
            .get(&id)
            .and_then(|c| c.player.clone())
    }

    /// Number of live connections, joined or not
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Number of joined players
    pub async fn player_count(&self) -> usize {
        self.inner
            .read()
            .await
            .connections
            .values()
            .filter(|c| c.player.is_some())
            .count()
    }
}
