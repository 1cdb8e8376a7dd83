//! Relay configuration
//!
//! Loads server settings and map data from a TOML file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use super::map::{default_objectives, default_spawn_points, MapData, Objective};
use crate::player::Vec3;

/// Default configuration file name
pub const CONFIG_FILE: &str = "relay.toml";

/// Default respawn cooldown in milliseconds
pub const DEFAULT_RESPAWN_COOLDOWN_MS: u64 = 5000;

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// When a connection becomes visible to other players
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JoinPolicy {
    /// Visible once the client sends `player:join`
    #[default]
    OnJoin,
    /// Registered at the default position as soon as the socket connects
    Immediate,
}

/// Relay server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelayConfig {
    /// Minimum time between two granted respawns
    pub respawn_cooldown_ms: u64,
    /// Visibility policy for new connections
    pub join_policy: JoinPolicy,
    /// Position used for players registered on connect
    pub default_position: Vec3,
    /// Points eligible for join and respawn
    pub spawn_points: Vec<Vec3>,
    /// Informational map markers
    pub objectives: Vec<Objective>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            respawn_cooldown_ms: DEFAULT_RESPAWN_COOLDOWN_MS,
            join_policy: JoinPolicy::default(),
            default_position: Vec3::new(0.0, 0.5, 0.0),
            spawn_points: default_spawn_points(),
            objectives: default_objectives(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: RelayConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants the relay relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spawn_points.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one spawn point is required".to_string(),
            ));
        }
        if let Some(index) = self.spawn_points.iter().position(|p| !p.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "spawn point {} has a non-finite coordinate",
                index
            )));
        }
        if let Some(objective) = self.objectives.iter().find(|o| !o.position().is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "objective '{}' has a non-finite coordinate",
                objective.name
            )));
        }
        if !self.default_position.is_finite() {
            return Err(ConfigError::Invalid(
                "default_position has a non-finite coordinate".to_string(),
            ));
        }
        Ok(())
    }

    /// Static map payload sent to every new connection
    pub fn map_data(&self) -> MapData {
        MapData {
            spawn_points: self.spawn_points.clone(),
            objectives: self.objectives.clone(),
            respawn_cooldown_ms: self.respawn_cooldown_ms,
        }
    }
}
