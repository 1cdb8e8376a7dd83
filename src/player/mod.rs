//! Player state module
//!
//! Tracks every live connection's public state and enforces the join,
//! update and respawn rules.

mod clock;
mod registry;
mod state;

pub use clock::*;
pub use registry::*;
pub use state::*;
