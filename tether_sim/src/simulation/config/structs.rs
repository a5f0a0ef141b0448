// tether_sim/src/simulation/config/structs.rs

use bevy::prelude::Resource;
use serde::Deserialize;
use tether_core::config::PlacementSettings;
use tether_core::error::SessionErrorCode;
use tether_core::types::TrackingQuality;

// =========================================================================
// == Top-Level Configuration Resource ==
// =========================================================================

/// # ScenarioConfig
/// The primary Bevy resource holding all configuration for a simulation run.
/// This struct is the root of the data parsed from a `scenario.toml` file.
#[derive(Resource, Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)] // Fail if the TOML has fields not in our struct
pub struct ScenarioConfig {
    #[serde(default)] // Use default if the [simulation] section is missing
    pub simulation: Simulation,

    #[serde(default)]
    pub settings: PlacementSettings,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub world: WorldConfig,

    // The TOML has `[[timeline]]`, which becomes a Vec of TimelineEntry structs.
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
}

// =========================================================================
// == Configuration Sub-Structs ==
// These map directly to the sections in your scenario.toml file.
// =========================================================================

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Simulation {
    /// Optional seed for the pseudo-random number generator for determinism.
    pub seed: Option<u64>,
    /// Duration of the simulation in seconds.
    pub duration_seconds: f64,
    /// Simulated frames per second; each update advances time by one frame.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
}

fn default_frame_rate() -> f64 {
    60.0
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            seed: None,
            duration_seconds: 30.0,
            frame_rate: default_frame_rate(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CameraConfig {
    /// Starting eye position, world frame (Y up), meters.
    pub position: [f64; 3],
    /// The point the camera keeps looking at.
    pub look_at: [f64; 3],
    /// Vertical field of view in degrees.
    #[serde(default = "default_fov")]
    pub fov_deg: f64,
    /// Viewport size in pixels, `[width, height]`.
    #[serde(default = "default_viewport")]
    pub viewport: [f64; 2],
    /// Standard deviation of the per-frame positional hand jitter (meters).
    #[serde(default)]
    pub jitter_stddev: f64,
    /// The camera orbits `look_at` at this rate (degrees per second).
    #[serde(default)]
    pub orbit_speed_deg: f64,
}

fn default_fov() -> f64 {
    60.0
}

fn default_viewport() -> [f64; 2] {
    [1170.0, 2532.0]
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 1.4, 1.0],
            look_at: [0.0, 0.7, -1.0],
            fov_deg: default_fov(),
            viewport: default_viewport(),
            jitter_stddev: 0.0,
            orbit_speed_deg: 0.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct WorldConfig {
    /// Ground-truth horizontal surfaces of the simulated room.
    #[serde(default)]
    pub surfaces: Vec<SurfaceConfig>,
    /// Feature points sampled on each surface.
    #[serde(default = "default_features_per_surface")]
    pub features_per_surface: usize,
    /// Vertical noise on sampled feature points (meters).
    #[serde(default)]
    pub feature_noise_stddev: f64,
    /// Ambient light in lumens, reported when light estimation is on.
    #[serde(default = "default_ambient_intensity")]
    pub ambient_intensity: f64,
}

fn default_features_per_surface() -> usize {
    200
}

fn default_ambient_intensity() -> f64 {
    1000.0
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            surfaces: Vec::new(),
            features_per_surface: default_features_per_surface(),
            feature_noise_stddev: 0.0,
            ambient_intensity: default_ambient_intensity(),
        }
    }
}

/// A horizontal rectangle in the world.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    pub name: String,
    /// Center of the rectangle, world frame.
    pub center: [f64; 3],
    /// Size along world X and Z, `[width, depth]`.
    pub size: [f64; 2],
}

// =========================================================================
// == Timeline ==
// =========================================================================

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TimelineEntry {
    /// Simulation time in seconds at which the event fires.
    pub at: f64,
    pub event: TimelineEvent,
}

/// Something that happens to the simulated session or user at a point in time.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", deny_unknown_fields)]
pub enum TimelineEvent {
    /// The tracking subsystem reports a new quality.
    TrackingQuality { quality: TrackingQuality },
    /// A surface is detected. `surface` names one of `[world].surfaces`.
    AnchorAdded {
        id: u64,
        surface: String,
        /// Error of the first height estimate (meters).
        #[serde(default)]
        height_error: f64,
        /// Fraction of the true extent detected so far.
        #[serde(default = "default_coverage")]
        coverage: f64,
    },
    /// A detected surface is refined.
    AnchorUpdated {
        id: u64,
        surface: String,
        #[serde(default)]
        height_error: f64,
        #[serde(default = "default_coverage")]
        coverage: f64,
    },
    AnchorRemoved { id: u64 },
    Interrupted,
    InterruptionEnded,
    Failed {
        code: SessionErrorCode,
        description: String,
        #[serde(default)]
        failure_reason: Option<String>,
        #[serde(default)]
        recovery_suggestions: Vec<String>,
    },
    /// The user picks an object from the catalog. The load runs in the
    /// background while frames keep ticking.
    LoadObject { name: String },
    /// A tap at a screen point (pixels).
    Tap { x: f64, y: f64 },
    /// One drag sample at a screen point (pixels).
    Drag { x: f64, y: f64 },
    /// A rotate and pinch gesture on the placed object.
    TransformObject {
        /// Absolute yaw about world +Y, degrees.
        yaw_deg: f64,
        #[serde(default = "default_scale")]
        scale: f64,
    },
    /// The user presses the restart button.
    Restart,
    /// The user picks "Reset" on the presented alert.
    AlertReset,
    /// The user changes settings.
    UpdateSettings { settings: PlacementSettings },
}

fn default_coverage() -> f64 {
    1.0
}

fn default_scale() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::{
        providers::{Format, Toml},
        Figment,
    };
    use tether_core::types::LimitedReason;

    const SCENARIO: &str = r#"
        [simulation]
        seed = 7
        duration_seconds = 12.0

        [settings]
        use_3dof_fallback = true

        [camera]
        position = [0.0, 1.5, 0.5]
        look_at = [0.0, 0.75, -1.0]
        jitter_stddev = 0.002

        [world]
        features_per_surface = 50
        surfaces = [
            { name = "table", center = [0.0, 0.75, -1.0], size = [1.2, 0.8] },
        ]

        [[timeline]]
        at = 1.0
        event = { kind = "TrackingQuality", quality = { Limited = "Initializing" } }

        [[timeline]]
        at = 2.0
        event = { kind = "AnchorAdded", id = 1, surface = "table", height_error = 0.02 }

        [[timeline]]
        at = 3.0
        event = { kind = "Tap", x = 585.0, y = 1266.0 }

        [[timeline]]
        at = 4.0
        event = { kind = "Restart" }
    "#;

    #[test]
    fn scenario_parses_with_defaults_filled_in() {
        let config: ScenarioConfig = Figment::new()
            .merge(Toml::string(SCENARIO))
            .extract()
            .unwrap();

        assert_eq!(config.simulation.seed, Some(7));
        assert_eq!(config.simulation.frame_rate, 60.0);
        assert!(config.settings.use_3dof_fallback);
        assert!(config.settings.drag_on_infinite_planes);
        assert_eq!(config.camera.fov_deg, 60.0);
        assert_eq!(config.world.surfaces[0].name, "table");
        assert_eq!(config.world.ambient_intensity, 1000.0);
        assert_eq!(config.timeline.len(), 4);
        assert_eq!(
            config.timeline[0].event,
            TimelineEvent::TrackingQuality {
                quality: TrackingQuality::Limited(LimitedReason::Initializing)
            }
        );
        assert_eq!(
            config.timeline[1].event,
            TimelineEvent::AnchorAdded {
                id: 1,
                surface: "table".into(),
                height_error: 0.02,
                coverage: 1.0
            }
        );
        assert_eq!(config.timeline[3].event, TimelineEvent::Restart);
    }

    #[test]
    fn load_events_have_no_frame_blocking_mode() {
        let parse = |event: &str| {
            Figment::new()
                .merge(Toml::string(&format!("[[timeline]]\nat = 1.0\nevent = {}\n", event)))
                .extract::<ScenarioConfig>()
        };

        let config = parse(r#"{ kind = "LoadObject", name = "lamp" }"#).unwrap();
        assert_eq!(
            config.timeline[0].event,
            TimelineEvent::LoadObject { name: "lamp".into() }
        );
        assert!(parse(r#"{ kind = "LoadObject", name = "lamp", blocking = true }"#).is_err());

        let config = parse(r#"{ kind = "TransformObject", yaw_deg = 45.0 }"#).unwrap();
        assert_eq!(
            config.timeline[0].event,
            TimelineEvent::TransformObject { yaw_deg: 45.0, scale: 1.0 }
        );
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let result: Result<ScenarioConfig, _> = Figment::new()
            .merge(Toml::string("[settings]\nshow_world_origin = true\n"))
            .extract();
        assert!(result.is_err());
    }
}
