// tether_sim/src/simulation/plugins/engine.rs

//! Hosts the placement engine as a Bevy resource and feeds it, once per
//! update, the session's events, the user's input and the latest frame.

use nalgebra::{UnitQuaternion, Vector3};

use crate::prelude::*;
use crate::simulation::config::ObjectCatalog;
use crate::simulation::core::events::{BevySessionEvent, UserInput};
use crate::simulation::plugins::camera::{CameraRig, LatestFrame};
use crate::simulation::plugins::notifier::SimNotifier;
use crate::simulation::plugins::raycasting::{GeometricRayCaster, PinholeIntrinsics};
use crate::simulation::plugins::scene::SimSceneGraph;
use crate::simulation::plugins::session::{SimSessionState, SimTrackingSession};

pub type SimEngine = PlacementEngine<SimTrackingSession, SimSceneGraph, SimNotifier>;

/// A Bevy resource wrapping the pure placement engine.
#[derive(Resource)]
pub struct TetherEngine(pub SimEngine);

/// The user's settings screen.
#[derive(Resource, Debug, Clone, Copy)]
pub struct UserSettings(pub PlacementSettings);

impl SettingsStore for UserSettings {
    fn snapshot(&self) -> PlacementSettings {
        self.0
    }
}

/// How the user's requests fared, for the final report.
#[derive(Resource, Debug, Default, Clone, PartialEq)]
pub struct InteractionStats {
    pub loads_started: usize,
    pub loads_rejected: usize,
    pub unknown_objects: usize,
    pub placements: usize,
    pub placement_misses: usize,
    pub transforms: usize,
    pub restarts: usize,
    pub restarts_refused: usize,
    pub alert_resets: usize,
}

pub struct EnginePlugin;

impl Plugin for EnginePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<InteractionStats>()
            .add_systems(
                OnEnter(AppState::SceneBuilding),
                build_engine.in_set(SceneBuildSet::Engine),
            )
            .add_systems(
                Update,
                (
                    sync_engine_clock,
                    handle_session_events,
                    handle_user_input,
                    tick_engine,
                    fire_scheduled_messages,
                )
                    .chain()
                    .in_set(SimulationSet::Engine),
            );
    }
}

// =========================================================================
// == Scene Building ==
// =========================================================================

fn build_engine(mut commands: Commands, config: Res<ScenarioConfig>, time: Res<Time>) {
    let (session, session_queue) = SimTrackingSession::channel();
    let (scene, scene_queue) = SimSceneGraph::channel();
    let notifier = SimNotifier::new(config.settings.debug_mode);
    let intrinsics = PinholeIntrinsics {
        fov_deg: config.camera.fov_deg,
        viewport: config.camera.viewport,
    };

    let mut engine = PlacementEngine::new(
        session,
        scene,
        notifier,
        config.settings,
        intrinsics.screen_center(),
    );
    let now = time.elapsed_secs_f64();
    engine.notifier_mut().set_clock(now);
    engine.start(now);
    info!("[ENGINE] Placement engine started with {:?}", engine.session_config());

    commands.insert_resource(TetherEngine(engine));
    commands.insert_resource(UserSettings(config.settings));
    commands.insert_resource(session_queue);
    commands.insert_resource(scene_queue);
}

// =========================================================================
// == Runtime Systems ==
// =========================================================================

fn sync_engine_clock(time: Res<Time>, mut engine: ResMut<TetherEngine>) {
    engine.0.notifier_mut().set_clock(time.elapsed_secs_f64());
}

fn handle_session_events(
    time: Res<Time>,
    mut events: EventReader<BevySessionEvent>,
    mut engine: ResMut<TetherEngine>,
) {
    let now = time.elapsed_secs_f64();
    for BevySessionEvent(event) in events.read() {
        engine.0.handle_session_event(event.clone(), now);
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_user_input(
    mut inputs: EventReader<UserInput>,
    mut engine: ResMut<TetherEngine>,
    mut settings: ResMut<UserSettings>,
    mut stats: ResMut<InteractionStats>,
    catalog: Res<ObjectCatalog>,
    latest: Res<LatestFrame>,
    state: Res<SimSessionState>,
    rig: Res<CameraRig>,
) {
    let engine = &mut engine.0;
    for input in inputs.read() {
        match input {
            UserInput::LoadObject { name } => {
                let Some(entry) = catalog.get(name) else {
                    warn!("[INPUT] No catalog entry named '{}'", name);
                    stats.unknown_objects += 1;
                    continue;
                };
                match engine.load_object(&entry.descriptor, &entry.loader()) {
                    LoadRequest::Started(id) => {
                        info!("[INPUT] Loading '{}' as {:?}", name, id);
                        stats.loads_started += 1;
                    }
                    LoadRequest::Rejected => {
                        info!("[INPUT] Load of '{}' rejected, another load is in flight", name);
                        stats.loads_rejected += 1;
                    }
                }
            }
            UserInput::Tap(point) | UserInput::Drag(point) => {
                let Some(frame) = latest.0.as_ref() else {
                    warn!("[INPUT] No camera frame yet, ignoring gesture");
                    continue;
                };
                let caster = GeometricRayCaster::new(frame, rig.intrinsics, state.anchors.values().cloned());
                let request = match input {
                    UserInput::Tap(_) => MoveRequest::tap(*point),
                    _ => MoveRequest::drag(*point),
                };
                match engine.move_object(request, &caster) {
                    Some(hit) => {
                        debug!("[INPUT] Object moved via {:?} to {:?}", hit.source, hit.position);
                        stats.placements += 1;
                    }
                    None => stats.placement_misses += 1,
                }
            }
            UserInput::TransformObject { yaw_deg, scale } => {
                let orientation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), yaw_deg.to_radians());
                if engine.transform_object(orientation, *scale) {
                    stats.transforms += 1;
                } else {
                    info!("[INPUT] No placed object to rotate or scale");
                }
            }
            UserInput::Restart => {
                if engine.restart_experience() {
                    stats.restarts += 1;
                } else {
                    info!("[INPUT] Restart is not available right now");
                    stats.restarts_refused += 1;
                }
            }
            UserInput::AlertReset => {
                engine.on_alert_action(AlertAction::Reset);
                stats.alert_resets += 1;
            }
            UserInput::UpdateSettings(new_settings) => {
                settings.0 = *new_settings;
                engine.notifier_mut().set_debug_visible(new_settings.debug_mode);
                engine.update_settings(&*settings);
            }
        }
    }
}

fn tick_engine(
    time: Res<Time>,
    latest: Res<LatestFrame>,
    state: Res<SimSessionState>,
    rig: Res<CameraRig>,
    mut engine: ResMut<TetherEngine>,
) {
    let Some(frame) = latest.0.clone() else {
        return;
    };
    let caster = GeometricRayCaster::new(&frame, rig.intrinsics, state.anchors.values().cloned());
    engine.0.tick(time.elapsed_secs_f64(), frame, &caster);
}

fn fire_scheduled_messages(time: Res<Time>, mut engine: ResMut<TetherEngine>) {
    engine.0.notifier_mut().fire_due(time.elapsed_secs_f64());
}
