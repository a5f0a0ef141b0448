// tether_sim/src/simulation/plugins/camera.rs

//! The handheld camera: an orbiting, jittering eye that produces one
//! `CameraFrame` per update from the session's current state.

use nalgebra::{Point3, Rotation3, Vector3};
use rand_distr::{Distribution, Normal};
use tether_core::types::Transform;

use crate::prelude::*;
use crate::simulation::config::structs::CameraConfig;
use crate::simulation::core::prng::SimulationRng;
use crate::simulation::core::transforms::{look_at_pose, matrix_to_bevy_transform};
use crate::simulation::plugins::raycasting::PinholeIntrinsics;
use crate::simulation::plugins::session::{dispatch_timeline, SimSessionState};
use crate::simulation::plugins::world::WorldFeatures;

/// Marks the entity that mirrors the device camera's pose.
#[derive(Component, Debug)]
pub struct DeviceCamera;

#[derive(Resource, Debug, Clone)]
pub struct CameraRig {
    pub eye: Point3<f64>,
    pub target: Point3<f64>,
    pub intrinsics: PinholeIntrinsics,
    /// Orbit rate around the target's vertical axis (degrees per second).
    pub orbit_speed_deg: f64,
    jitter: Option<Normal<f64>>,
}

impl CameraRig {
    pub fn from_config(config: &CameraConfig) -> Self {
        let jitter = match Normal::new(0.0, config.jitter_stddev) {
            Ok(jitter) if config.jitter_stddev > 0.0 => Some(jitter),
            Ok(_) => None,
            Err(e) => {
                warn!("Invalid camera jitter ({}), disabling it", e);
                None
            }
        };
        Self {
            eye: Point3::from(config.position),
            target: Point3::from(config.look_at),
            intrinsics: PinholeIntrinsics {
                fov_deg: config.fov_deg,
                viewport: config.viewport,
            },
            orbit_speed_deg: config.orbit_speed_deg,
            jitter,
        }
    }

    /// The eye position after orbiting for `elapsed` seconds.
    pub fn eye_at(&self, elapsed: f64) -> Point3<f64> {
        let angle = (self.orbit_speed_deg * elapsed).to_radians();
        let rotation = Rotation3::from_axis_angle(&Vector3::y_axis(), angle);
        self.target + rotation * (self.eye - self.target)
    }

    /// Camera-to-world pose at `elapsed`, shaken by hand jitter.
    pub fn pose_at(&self, elapsed: f64, rng: &mut impl rand::Rng) -> Transform {
        let shake = self
            .jitter
            .map_or_else(Vector3::zeros, |jitter| Vector3::from_fn(|_, _| jitter.sample(rng)));
        let eye = self.eye_at(elapsed) + shake;
        look_at_pose(&eye, &self.target)
    }
}

/// The frame the session produced this update.
#[derive(Resource, Debug, Default)]
pub struct LatestFrame(pub Option<CameraFrame>);

pub struct CameraRigPlugin;

impl Plugin for CameraRigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LatestFrame>()
            .add_systems(
                OnEnter(AppState::SceneBuilding),
                spawn_camera_rig.in_set(SceneBuildSet::World),
            )
            .add_systems(
                Update,
                synthesize_frame
                    .in_set(SimulationSet::Session)
                    .after(dispatch_timeline),
            );
    }
}

fn spawn_camera_rig(mut commands: Commands, config: Res<ScenarioConfig>) {
    let rig = CameraRig::from_config(&config.camera);
    info!(
        "[CAMERA] Eye at {:?}, looking at {:?}, {:.0} deg fov",
        rig.eye, rig.target, rig.intrinsics.fov_deg
    );
    commands.spawn((
        Name::new("device-camera"),
        DeviceCamera,
        matrix_to_bevy_transform(&look_at_pose(&rig.eye, &rig.target)),
    ));
    commands.insert_resource(rig);
}

fn synthesize_frame(
    time: Res<Time>,
    config: Res<ScenarioConfig>,
    rig: Res<CameraRig>,
    state: Res<SimSessionState>,
    features: Res<WorldFeatures>,
    mut rng: ResMut<SimulationRng>,
    mut latest: ResMut<LatestFrame>,
    mut camera: Query<&mut bevy::prelude::Transform, With<DeviceCamera>>,
) {
    let pose = rig.pose_at(time.elapsed_secs_f64(), &mut rng.0);
    for mut transform in &mut camera {
        *transform = matrix_to_bevy_transform(&pose);
    }
    latest.0 = Some(build_frame(pose, &state, &features.0, config.world.ambient_intensity));
}

/// What the session reports for a camera at `pose`. Nothing is reconstructed
/// before the session runs or while tracking is unavailable.
pub fn build_frame(
    pose: Transform,
    state: &SimSessionState,
    features: &[Point3<f64>],
    ambient_intensity: f64,
) -> CameraFrame {
    let tracking = state.running && !state.interrupted && state.quality != TrackingQuality::NotAvailable;
    CameraFrame {
        pose,
        tracking_quality: state.quality,
        light_estimate: (state.running && state.config.light_estimation)
            .then_some(LightEstimate { ambient_intensity }),
        feature_points: tracking.then(|| features.to_vec()),
    }
}
