// tether_sim/src/simulation/core/prng.rs

use bevy::prelude::Resource;
use rand_chacha::ChaCha8Rng;

/// A newtype wrapper around `ChaCha8Rng` to make it a Bevy Resource.
/// The single source of randomness for hand jitter and feature sampling.
#[derive(Resource)]
pub struct SimulationRng(pub ChaCha8Rng);
