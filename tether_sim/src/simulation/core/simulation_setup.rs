// tether_sim/src/simulation/core/simulation_setup.rs

use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::prelude::*;
use crate::simulation::core::events::{BevySessionEvent, UserInput};
use crate::simulation::core::prng::SimulationRng;

pub struct SimulationSetupPlugin;

impl Plugin for SimulationSetupPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<BevySessionEvent>().add_event::<UserInput>();

        // --- CONFIGURE THE SCENE BUILDING PIPELINE ---
        app.configure_sets(
            OnEnter(AppState::SceneBuilding),
            (
                SceneBuildSet::Seed,
                SceneBuildSet::World,
                SceneBuildSet::Engine,
                SceneBuildSet::Finalize,
            )
                .chain(),
        );

        app.add_systems(
            OnEnter(AppState::SceneBuilding),
            (
                seed_simulation_rng.in_set(SceneBuildSet::Seed),
                transition_to_running.in_set(SceneBuildSet::Finalize),
            ),
        );

        // Configure the runtime schedule graph. Every set only runs while the
        // scenario is playing.
        app.configure_sets(
            Update,
            (
                SimulationSet::Session,
                SimulationSet::Engine,
                SimulationSet::Scene,
                SimulationSet::Report,
            )
                .chain()
                .run_if(in_state(AppState::Running)),
        );
    }
}

/// Seeds the deterministic PRNG from the scenario, or from the OS when the
/// scenario leaves the seed unset.
fn seed_simulation_rng(mut commands: Commands, config: Res<ScenarioConfig>) {
    let rng = match config.simulation.seed {
        Some(seed) => {
            info!("Seeding simulation PRNG with {}", seed);
            ChaCha8Rng::seed_from_u64(seed)
        }
        None => match ChaCha8Rng::from_rng(OsRng) {
            Ok(rng) => rng,
            Err(e) => {
                warn!("OS RNG failed ({}), falling back to seed 0", e);
                ChaCha8Rng::seed_from_u64(0)
            }
        },
    };
    commands.insert_resource(SimulationRng(rng));
}

/// This simple system runs once at the end of the `OnEnter(SceneBuilding)` chain.
/// Its only job is to move the app into the main `Running` state.
fn transition_to_running(mut next_state: ResMut<NextState<AppState>>) {
    info!("Scene building complete. Transitioning to Running state.");
    next_state.set(AppState::Running);
}
