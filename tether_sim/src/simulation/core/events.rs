// tether_sim/src/simulation/core/events.rs

use bevy::prelude::Event;
use tether_core::prelude::{PlacementSettings, ScreenPoint, SessionEvent};

/// A Bevy event wrapper for a pure `SessionEvent` raised by the simulated session.
#[derive(Event, Debug, Clone)]
pub struct BevySessionEvent(pub SessionEvent);

/// Something the simulated user does.
#[derive(Event, Debug, Clone, PartialEq)]
pub enum UserInput {
    LoadObject { name: String },
    /// Rotate and pinch: absolute yaw in degrees and uniform scale.
    TransformObject { yaw_deg: f64, scale: f64 },
    Tap(ScreenPoint),
    Drag(ScreenPoint),
    Restart,
    AlertReset,
    UpdateSettings(PlacementSettings),
}
