// tether_sim/src/prelude.rs

// Re-export the entire Bevy prelude for convenience.
pub use bevy::prelude::*;

// Re-export the entire tether_core prelude so the pure engine types are at hand.
// Its `Transform` (a 4x4 matrix) shares a name with Bevy's component; files that
// use either import it explicitly.
pub use tether_core::prelude::*;

// Re-export common simulation-specific types for easy access in other plugins.
pub use crate::simulation::config::structs::ScenarioConfig;
pub use crate::simulation::core::app_state::{AppState, SceneBuildSet, SimulationSet};
pub use crate::simulation::plugins::engine::TetherEngine;
