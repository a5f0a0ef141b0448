// tether_sim/src/simulation/plugins/mod.rs

pub mod camera;
pub mod engine;
pub mod notifier;
pub mod raycasting;
pub mod reporting;
pub mod scene;
pub mod session;
pub mod world;
