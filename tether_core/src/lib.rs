// tether_core/src/lib.rs

// Public modules of the placement and tracking-state engine.
pub mod abstractions;
pub mod config;
pub mod engine;
pub mod error;
pub mod focus;
pub mod hit_test;
pub mod math;
pub mod messages;
pub mod objects;
pub mod planes;
pub mod prelude;
pub mod scheduling;
pub mod smoothing;
pub mod tracking;
pub mod types;
