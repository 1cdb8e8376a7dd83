//! Static map data
//!
//! Spawn points and objectives shared by every connection. Read-only after
//! startup and sent once to each client in `map:data`.

use serde::{Deserialize, Serialize};

use crate::player::Vec3;

/// A named marker in the world, purely informational
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Objective {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Label shown by the client
    pub name: String,
}

impl Objective {
    /// Create a new objective
    pub fn new(name: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            name: name.into(),
        }
    }

    /// World position of the marker
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Payload of the `map:data` event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MapData {
    /// Points eligible for join and respawn
    pub spawn_points: Vec<Vec3>,
    /// Informational markers
    pub objectives: Vec<Objective>,
    /// Minimum time between two granted respawns
    pub respawn_cooldown_ms: u64,
}

pub(crate) fn default_spawn_points() -> Vec<Vec3> {
    vec![
        Vec3::new(-8.0, 0.5, -8.0),
        Vec3::new(8.0, 0.5, -8.0),
        Vec3::new(-8.0, 0.5, 8.0),
        Vec3::new(8.0, 0.5, 8.0),
    ]
}

pub(crate) fn default_objectives() -> Vec<Objective> {
    vec![
        Objective::new("North Tower", 0.0, 0.5, -15.0),
        Objective::new("East Gate", 15.0, 0.5, 0.0),
        Objective::new("Harbor", -12.0, 0.5, 10.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_data_uses_camel_case() {
        let data = MapData {
            spawn_points: vec![Vec3::new(1.0, 0.5, 2.0)],
            objectives: vec![Objective::new("Flag", 3.0, 0.0, 4.0)],
            respawn_cooldown_ms: 5000,
        };
        let json = serde_json::to_value(&data).unwrap();

        assert_eq!(json["respawnCooldownMs"], 5000);
        assert_eq!(json["spawnPoints"][0]["z"], 2.0);
        assert_eq!(json["objectives"][0]["name"], "Flag");
        assert_eq!(json["objectives"][0]["x"], 3.0);
    }

    #[test]
    fn test_objective_position() {
        let objective = Objective::new("Flag", 3.0, 0.0, 4.0);
        assert_eq!(objective.position(), Vec3::new(3.0, 0.0, 4.0));
    }

    #[test]
    fn test_defaults_are_non_empty() {
        assert!(!default_spawn_points().is_empty());
        assert!(!default_objectives().is_empty());
    }
}
