// tether_sim/examples/01_tabletop_session.rs

//! A full end-to-end run of the Tether placement engine.
//!
//! This example:
//! 1. Parses the scenario and catalog paths from the command line.
//! 2. Sets up a headless Bevy app whose clock advances one frame per update.
//! 3. Adds the `TetherSimulationPlugin`, which plays the scenario timeline
//!    against the engine and logs a report when it ends.
//!
//! To run this example:
//! `cargo run --example 01_tabletop_session -- --scenario assets/scenarios/00_tabletop_showcase.toml`

use std::time::Duration;

use bevy::{
    app::ScheduleRunnerPlugin, log::LogPlugin, prelude::*, state::app::StatesPlugin,
    time::TimeUpdateStrategy,
};
use clap::Parser;
use figment::{
    providers::{Format, Toml},
    Figment,
};

use tether_sim::cli::Cli;
use tether_sim::prelude::{AppState, ScenarioConfig};
use tether_sim::TetherSimulationPlugin;

fn main() {
    let cli = Cli::parse();

    // The frame rate is needed before the app exists, so peek at the scenario.
    // A broken file is reported properly once the config plugin loads it.
    let frame_rate = Figment::new()
        .merge(Toml::file(&cli.scenario))
        .extract::<ScenarioConfig>()
        .map(|config| config.simulation.frame_rate)
        .unwrap_or(60.0);
    let frame = Duration::from_secs_f64(1.0 / frame_rate.max(1.0));

    let mut app = App::new();

    app.add_plugins((
        // Headless: no window, no renderer. Each update sleeps out the frame so
        // background loads progress in step with simulated time.
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(frame)),
        StatesPlugin,
        TransformPlugin,
        LogPlugin {
            level: bevy::log::Level::INFO,
            // A good filter for focusing on our crates' logs.
            filter: "info,tether_core=debug,tether_sim=debug".to_string(),
            ..default()
        },
    ))
    // Every update advances the virtual clock by exactly one frame.
    .insert_resource(TimeUpdateStrategy::ManualDuration(frame))
    .insert_resource(cli);

    app.init_state::<AppState>();

    // This single line brings in the whole simulation: config loading, the
    // session, the camera, the engine and the report.
    app.add_plugins(TetherSimulationPlugin);

    println!("Starting Tether simulation...");
    app.run();
}
