// tether_core/src/config.rs

use serde::Deserialize;

// =========================================================================
// == Tuning Constants ==
// =========================================================================

/// Objects are never committed farther than this from the camera (meters).
pub const MAX_PLACEMENT_DISTANCE: f64 = 10.0;
/// Capacity of the recent object-to-camera distance history.
pub const DISTANCE_HISTORY_CAPACITY: usize = 10;

/// Half-angle of the acceptance cone for high-quality feature hits (degrees).
pub const FEATURE_CONE_HALF_ANGLE_DEG: f64 = 18.0;
/// Distance window for high-quality feature hits (meters from the camera).
pub const FEATURE_MIN_DISTANCE: f64 = 0.2;
pub const FEATURE_MAX_DISTANCE: f64 = 2.0;

/// Fraction of a plane's extent added on each side when testing snap bounds.
pub const SNAP_EXTENT_TOLERANCE: f64 = 0.1;
/// Vertical band around a plane inside which an object snaps onto it (meters).
pub const SNAP_VERTICAL_ALLOWANCE: f64 = 0.03;
/// Duration of the snap correction animation (seconds).
pub const SNAP_ANIMATION_SECS: f64 = 0.5;

/// Limited tracking held this long switches to the ThreeDOF fallback (seconds).
pub const TRACKING_FALLBACK_SECS: f64 = 10.0;
/// Delay before escalating a "not available" warning (seconds).
pub const NOT_AVAILABLE_ESCALATION_SECS: f64 = 5.0;
/// Delay before escalating a "limited" warning when the fallback is disabled (seconds).
pub const LIMITED_ESCALATION_SECS: f64 = 10.0;
/// The restart action stays disabled this long after a restart (seconds).
pub const RESTART_GRACE_SECS: f64 = 5.0;

/// Delay of the "find a surface" and "tap to place" prompts (seconds).
pub const PLACEMENT_PROMPT_SECS: f64 = 7.5;
/// Delay of the focus square "move left or right" hint (seconds).
pub const FOCUS_HINT_SECS: f64 = 5.0;

/// Environment intensity used when the frame carries no light estimate.
pub const DEFAULT_ENVIRONMENT_INTENSITY: f64 = 25.0;
/// Ambient intensity (lumens) is divided by this to get environment intensity.
pub const AMBIENT_INTENSITY_DIVISOR: f64 = 40.0;

// =========================================================================
// == User Settings ==
// =========================================================================

/// A snapshot of the user-facing settings, read once per settings-update pass
/// and threaded into the components that need each flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlacementSettings {
    #[serde(default = "default_true")]
    pub ambient_light_estimation: bool,
    #[serde(default = "default_true")]
    pub drag_on_infinite_planes: bool,
    #[serde(default)]
    pub use_3dof_tracking: bool,
    #[serde(default)]
    pub use_3dof_fallback: bool,
    #[serde(default)]
    pub show_hit_test_visualization: bool,
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PlacementSettings {
    fn default() -> Self {
        Self {
            ambient_light_estimation: true,
            drag_on_infinite_planes: true,
            use_3dof_tracking: false,
            use_3dof_fallback: false,
            show_hit_test_visualization: false,
            debug_mode: false,
        }
    }
}
