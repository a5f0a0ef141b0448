// tether_sim/src/simulation/core/app_state.rs

use bevy::{ecs::schedule::SystemSet, prelude::States};

/// Defines the major phases of the application's lifecycle.
#[derive(States, Debug, Clone, Eq, PartialEq, Hash, Default)]
pub enum AppState {
    /// The initial state. The scenario and the object catalog are read from disk.
    #[default]
    Loading,

    /// Configuration is loaded. The simulated room, the session and the engine
    /// are being built.
    SceneBuilding,

    /// The scenario timeline is playing.
    Running,

    /// The scenario ran to its end. A report has been logged.
    Finished,
}

// =========================================================================
// == Main Simulation Sets (The "Data Flow Graph") ==
// =========================================================================

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// The simulated tracking session: applies run requests, plays the
    /// timeline and synthesizes this frame's camera state.
    Session,
    /// The placement engine consumes session events and user input, then ticks.
    Engine,
    /// Scene-graph mutations issued by the engine are applied to the ECS world.
    Scene,
    /// End-of-run checks and reporting.
    Report,
}

/// System sets to control the order of execution during the SceneBuilding state.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SceneBuildSet {
    /// Pass 1: Seed the deterministic PRNG.
    Seed,
    /// Pass 2: Build the ground-truth room and the camera rig.
    World,
    /// Pass 3: Wire the session, scene and notifier into a fresh engine.
    Engine,
    /// Pass 4: Hand over to the main loop.
    Finalize,
}
