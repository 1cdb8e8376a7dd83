//! Configuration module
//!
//! Handles loading relay settings and the static map data.

mod map;
mod relay;

pub use map::*;
pub use relay::*;
