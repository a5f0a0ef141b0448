// tether_sim/src/lib.rs

use bevy::prelude::*;

// Import the plugins defined within the simulation crate.
use crate::simulation::config::ConfigPlugin;
use crate::simulation::core::simulation_setup::SimulationSetupPlugin;
use crate::simulation::plugins::camera::CameraRigPlugin;
use crate::simulation::plugins::engine::EnginePlugin;
use crate::simulation::plugins::reporting::ReportingPlugin;
use crate::simulation::plugins::scene::ScenePlugin;
use crate::simulation::plugins::session::SessionPlugin;
use crate::simulation::plugins::world::WorldSpawnerPlugin;

// This prelude is for convenience for other files WITHIN the tether_sim crate.
pub mod prelude;

// This module contains all the simulation-specific logic.
pub mod cli;
pub mod simulation;

/// The main plugin that brings together all the simulation parts.
/// A binary only needs the `Cli` resource, the app state and this plugin.
pub struct TetherSimulationPlugin;

impl Plugin for TetherSimulationPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            // Reads the scenario and the object catalog.
            ConfigPlugin,
            // PRNG, events and the schedule graph.
            SimulationSetupPlugin,
            // Ground-truth room and the handheld camera.
            WorldSpawnerPlugin,
            CameraRigPlugin,
            // The simulated tracking session and its scripted timeline.
            SessionPlugin,
            // The placement engine itself.
            EnginePlugin,
            // Mirrors the engine's scene graph into entities.
            ScenePlugin,
            ReportingPlugin,
        ));
    }
}
