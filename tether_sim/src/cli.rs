use bevy::prelude::Resource;
use clap::Parser;
use std::path::PathBuf;

/// Tether: a headless AR placement and tracking-state simulator.
///
/// This struct defines the command-line arguments that can be passed to any
/// binary application that uses the Tether simulation library.
#[derive(Parser, Debug, Resource, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The path to the scenario TOML file to run.
    #[arg(
        short,
        long,
        default_value = "assets/scenarios/00_tabletop_showcase.toml"
    )]
    pub scenario: PathBuf,

    /// The directory holding the virtual object catalog.
    #[arg(short, long, default_value = "assets/catalog")]
    pub catalog: PathBuf,

    /// Overrides the scenario's PRNG seed.
    #[arg(long)]
    pub seed: Option<u64>,
}
