// tether_sim/src/simulation/config/mod.rs

//! This module handles loading and validating all simulation configuration
//! from disk: the scenario file and the object catalog.

mod catalog;

pub mod structs;

use bevy::prelude::*;
use figment::{
    providers::{Format, Toml},
    Figment,
};

use crate::cli::Cli;
use crate::prelude::AppState;
use catalog::load_catalog_from_disk;
pub use catalog::{CatalogEntry, ObjectCatalog, SimObjectLoader};
pub use structs::ScenarioConfig;

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app
            // The resource for the loaded object catalog.
            .init_resource::<ObjectCatalog>()
            // The resource for the top-level scenario config.
            .init_resource::<ScenarioConfig>()
            // Add all the systems that run at startup to load and process config.
            .add_systems(
                OnEnter(AppState::Loading),
                (load_catalog_from_disk, load_scenario).chain(),
            );
    }
}

fn load_scenario(
    cli: Res<Cli>,
    mut scenario_config: ResMut<ScenarioConfig>,
    mut next_state: ResMut<NextState<AppState>>,
    mut exit: EventWriter<AppExit>,
) {
    info!("Loading scenario from: {:?}", cli.scenario);
    // A missing file would otherwise extract as an all-defaults scenario.
    if !cli.scenario.is_file() {
        error!("Scenario file not found at {:?}", cli.scenario);
        exit.write(AppExit::error());
        return;
    }

    match Figment::new().merge(Toml::file(&cli.scenario)).extract::<ScenarioConfig>() {
        Ok(mut loaded) => {
            if cli.seed.is_some() {
                loaded.simulation.seed = cli.seed;
            }
            // Events are dispatched in time order.
            loaded.timeline.sort_by(|a, b| a.at.total_cmp(&b.at));
            info!(
                "Scenario loaded: {} surfaces, {} timeline events, {:.1}s",
                loaded.world.surfaces.len(),
                loaded.timeline.len(),
                loaded.simulation.duration_seconds
            );
            *scenario_config = loaded;
            info!("Configuration loading complete. Transitioning to SceneBuilding state.");
            next_state.set(AppState::SceneBuilding);
        }
        Err(e) => {
            error!(
                "Failed to load or parse scenario file at {:?}: {}",
                cli.scenario, e
            );
            exit.write(AppExit::error());
        }
    }
}
