//! Player state and assignment rules
//!
//! Public per-player state plus the rules that turn untrusted join/respawn
//! requests into a valid spawn position, display name and color.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a live connection, assigned when the socket is accepted
pub type ConnectionId = Uuid;

/// Maximum display name length in characters
pub const MAX_NAME_LENGTH: usize = 32;

/// Prefix used for names derived from a connection id
pub const DEFAULT_NAME_PREFIX: &str = "Player-";

/// Number of id characters appended to the default name
const DEFAULT_NAME_ID_CHARS: usize = 4;

/// Largest 24-bit RGB value
const MAX_RGB: u32 = 0xFF_FFFF;

/// A point in world coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// True if every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Public state of a joined player, as seen by every client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerState {
    /// Current world position
    pub position: Vec3,
    /// Display name, never empty
    pub name: String,
    /// `#rrggbb` color
    pub color: String,
}

/// Resolve the display name for a player.
///
/// A requested name is trimmed and truncated to [`MAX_NAME_LENGTH`]
/// characters. Missing or blank names fall back to one derived from `id`.
pub fn resolve_name(requested: Option<&str>, id: &ConnectionId) -> String {
    match requested.map(str::trim) {
        Some(name) if !name.is_empty() => name.chars().take(MAX_NAME_LENGTH).collect(),
        _ => default_name(id),
    }
}

/// Name derived from a short prefix of the connection id
pub fn default_name(id: &ConnectionId) -> String {
    let prefix: String = id
        .simple()
        .to_string()
        .chars()
        .take(DEFAULT_NAME_ID_CHARS)
        .collect();
    format!("{DEFAULT_NAME_PREFIX}{prefix}")
}

/// Normalize a `rrggbb` or `#rrggbb` color to `#rrggbb`.
///
/// Returns `None` for anything else.
pub fn normalize_color(requested: &str) -> Option<String> {
    let hex = requested.strip_prefix('#').unwrap_or(requested);
    if hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{hex}"))
    } else {
        None
    }
}

/// True if `color` is a well-formed `#rrggbb` string
pub fn is_valid_color(color: &str) -> bool {
    color.starts_with('#') && normalize_color(color).as_deref() == Some(color)
}

/// Uniformly random `#rrggbb` color
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("#{:06x}", rng.gen_range(0..=MAX_RGB))
}

/// Use the requested color if it is valid, otherwise a random one
pub fn resolve_color<R: Rng + ?Sized>(requested: Option<&str>, rng: &mut R) -> String {
    requested
        .and_then(normalize_color)
        .unwrap_or_else(|| random_color(rng))
}

/// Pick a spawn point.
///
/// A requested index is honored only when it addresses an existing spawn
/// point; anything else falls back to a uniformly random choice.
pub fn select_spawn<R: Rng + ?Sized>(
    spawn_points: &[Vec3],
    requested: Option<i64>,
    rng: &mut R,
) -> Vec3 {
    let requested = requested
        .and_then(|index| usize::try_from(index).ok())
        .and_then(|index| spawn_points.get(index));

    match requested {
        Some(point) => *point,
        None => spawn_points.choose(rng).copied().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spawns() -> Vec<Vec3> {
        vec![
            Vec3::new(-8.0, 0.5, -8.0),
            Vec3::new(8.0, 0.5, -8.0),
            Vec3::new(-8.0, 0.5, 8.0),
        ]
    }

    #[test]
    fn test_resolve_name_uses_request() {
        let id = Uuid::new_v4();
        assert_eq!(resolve_name(Some("  Alice "), &id), "Alice");
    }

    #[test]
    fn test_resolve_name_blank_falls_back() {
        let id = Uuid::new_v4();
        let expected = default_name(&id);
        assert_eq!(resolve_name(None, &id), expected);
        assert_eq!(resolve_name(Some(""), &id), expected);
        assert_eq!(resolve_name(Some("   "), &id), expected);
        assert!(expected.starts_with(DEFAULT_NAME_PREFIX));
        assert_eq!(expected.len(), DEFAULT_NAME_PREFIX.len() + 4);
    }

    #[test]
    fn test_resolve_name_truncates() {
        let id = Uuid::new_v4();
        let long = "é".repeat(MAX_NAME_LENGTH + 10);
        assert_eq!(resolve_name(Some(&long), &id).chars().count(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_normalize_color() {
        assert_eq!(normalize_color("ff00aa"), Some("#ff00aa".to_string()));
        assert_eq!(normalize_color("#A1B2C3"), Some("#A1B2C3".to_string()));
        assert_eq!(normalize_color("zzzzzz"), None);
        assert_eq!(normalize_color("#fff"), None);
        assert_eq!(normalize_color("##ff00aa"), None);
        assert_eq!(normalize_color(""), None);
    }

    #[test]
    fn test_random_color_is_valid() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            assert!(is_valid_color(&random_color(&mut rng)));
        }
    }

    #[test]
    fn test_resolve_color_fallback() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(resolve_color(Some("00ff00"), &mut rng), "#00ff00");
        assert!(is_valid_color(&resolve_color(Some("zzzzzz"), &mut rng)));
        assert!(is_valid_color(&resolve_color(None, &mut rng)));
    }

    #[test]
    fn test_select_spawn_valid_index() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = spawns();
        assert_eq!(select_spawn(&points, Some(1), &mut rng), points[1]);
    }

    #[test]
    fn test_select_spawn_invalid_index_picks_known_point() {
        let mut rng = StdRng::seed_from_u64(3);
        let points = spawns();
        for requested in [None, Some(-1), Some(3), Some(i64::MAX)] {
            let chosen = select_spawn(&points, requested, &mut rng);
            assert!(points.contains(&chosen));
        }
    }

    #[test]
    fn test_select_spawn_is_deterministic_for_seed() {
        let points = spawns();
        let a: Vec<Vec3> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| select_spawn(&points, None, &mut rng)).collect()
        };
        let b: Vec<Vec3> = {
            let mut rng = StdRng::seed_from_u64(42);
            (0..10).map(|_| select_spawn(&points, None, &mut rng)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_select_spawn_empty_list() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(select_spawn(&[], Some(0), &mut rng), Vec3::default());
    }

    #[test]
    fn test_vec3_is_finite() {
        assert!(Vec3::new(1.0, 2.0, 3.0).is_finite());
        assert!(!Vec3::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Vec3::new(0.0, f64::INFINITY, 0.0).is_finite());
    }
}
