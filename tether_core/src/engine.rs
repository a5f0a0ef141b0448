// tether_core/src/engine.rs

//! The per-frame orchestrator.
//!
//! `PlacementEngine` owns the session, scene graph and notifier collaborators and
//! every piece of placement state. The host calls [`PlacementEngine::tick`] once
//! per rendered frame and forwards session events as they arrive; nothing in here
//! runs on its own, apart from the object load worker whose result is joined back
//! during `tick`.

use std::fmt;

use nalgebra::{Point3, UnitQuaternion};
use tracing::{debug, info, warn};

use crate::abstractions::{Notifier, ObjectLoader, RayCaster, SceneGraph, SettingsStore, TrackingSession};
use crate::config::{
    PlacementSettings, AMBIENT_INTENSITY_DIVISOR, DEFAULT_ENVIRONMENT_INTENSITY,
    PLACEMENT_PROMPT_SECS,
};
use crate::error::LoadError;
use crate::focus::FocusSquare;
use crate::hit_test::{HitTestCascade, WorldHit};
use crate::math::{distance, yaw_degrees};
use crate::messages::{
    AlertAction, CameraFrame, ControlAvailability, MessageType, PlaneAnchor, PlaneDetection,
    RunOptions, SessionConfig, SessionEvent,
};
use crate::objects::{LoadRequest, ObjectDescriptor, ObjectManager};
use crate::planes::{snap_target_height, PlaneRegistry};
use crate::tracking::{TrackingAction, TrackingStateMachine};
use crate::types::{ObjectId, ScreenPoint, TrackingMode};

// =========================================================================
// == Requests & Readouts ==
// =========================================================================

/// A candidate move for the active object, as produced by the host's gestures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    pub point: ScreenPoint,
    /// Place immediately (clearing the distance history) instead of moving incrementally.
    pub instantly: bool,
    /// Average the committed distance over recent samples.
    pub filtered: bool,
    /// Ask the cascade for the infinite horizontal plane even when features are good.
    pub allow_infinite_plane: bool,
}

impl MoveRequest {
    /// A single tap: jump straight to the touched surface.
    pub fn tap(point: ScreenPoint) -> Self {
        Self {
            point,
            instantly: true,
            filtered: false,
            allow_infinite_plane: false,
        }
    }

    /// A continuous drag: smoothed, free to slide across open floor.
    pub fn drag(point: ScreenPoint) -> Self {
        Self {
            point,
            instantly: false,
            filtered: true,
            allow_infinite_plane: true,
        }
    }
}

/// The active object's pose relative to the camera, for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectReadout {
    pub distance_to_camera: f64,
    /// Yaw in whole degrees, in [0, 360).
    pub rotation_degrees: i64,
    pub scale: f64,
}

impl fmt::Display for ObjectReadout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Distance: {:.2} m\nRotation: {}°\nScale: {:.2}x",
            self.distance_to_camera, self.rotation_degrees, self.scale
        )
    }
}

// =========================================================================
// == The Engine ==
// =========================================================================

pub struct PlacementEngine<S, G, N>
where
    S: TrackingSession,
    G: SceneGraph,
    N: Notifier,
{
    session: S,
    scene: G,
    notifier: N,
    settings: PlacementSettings,
    session_config: SessionConfig,
    cascade: HitTestCascade,
    planes: PlaneRegistry,
    objects: ObjectManager,
    tracking: TrackingStateMachine,
    focus: FocusSquare,
    screen_center: ScreenPoint,
    last_frame: Option<CameraFrame>,
    /// The crosshair's hit from the latest tick.
    focus_hit: Option<WorldHit>,
    now: f64,
}

impl<S, G, N> PlacementEngine<S, G, N>
where
    S: TrackingSession,
    G: SceneGraph,
    N: Notifier,
{
    pub fn new(session: S, scene: G, notifier: N, settings: PlacementSettings, screen_center: ScreenPoint) -> Self {
        let mode = if settings.use_3dof_tracking {
            TrackingMode::ThreeDof
        } else {
            TrackingMode::SixDof
        };
        let planes = PlaneRegistry::with_debug_visuals(settings.debug_mode);
        Self {
            session,
            scene,
            notifier,
            session_config: SessionConfig {
                mode,
                light_estimation: settings.ambient_light_estimation,
                plane_detection: plane_detection_for(mode),
            },
            cascade: HitTestCascade::new(&settings),
            planes,
            objects: ObjectManager::new(),
            tracking: TrackingStateMachine::new(settings.use_3dof_fallback),
            focus: FocusSquare::new(),
            settings,
            screen_center,
            last_frame: None,
            focus_hit: None,
            now: 0.0,
        }
    }

    // --- Accessors ---

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn scene(&self) -> &G {
        &self.scene
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn settings(&self) -> &PlacementSettings {
        &self.settings
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    pub fn planes(&self) -> &PlaneRegistry {
        &self.planes
    }

    pub fn objects(&self) -> &ObjectManager {
        &self.objects
    }

    pub fn tracking(&self) -> &TrackingStateMachine {
        &self.tracking
    }

    pub fn focus(&self) -> &FocusSquare {
        &self.focus
    }

    pub fn last_frame(&self) -> Option<&CameraFrame> {
        self.last_frame.as_ref()
    }

    /// The crosshair's latest hit, exposed only while hit-test visualization is on.
    pub fn hit_test_visualization(&self) -> Option<&WorldHit> {
        self.settings
            .show_hit_test_visualization
            .then_some(self.focus_hit.as_ref())
            .flatten()
    }

    /// Which competing UI actions may run right now.
    pub fn controls(&self) -> ControlAvailability {
        let idle = !self.objects.is_loading();
        ControlAvailability {
            add_object: idle,
            settings: idle,
            screenshot: idle,
            restart: idle && self.tracking.restart_enabled(),
        }
    }

    // --- Lifecycle ---

    /// First start of the experience: focus square, controls and plane detection.
    pub fn start(&mut self, now: f64) {
        self.now = now;
        info!("Starting placement engine in {:?}", self.session_config.mode);
        self.focus.setup(&mut self.notifier);
        self.objects.reset(&mut self.scene);
        self.restart_plane_detection();
        self.push_controls();
    }

    /// Advances the engine by one rendered frame.
    pub fn tick(&mut self, now: f64, frame: CameraFrame, ray_caster: &dyn RayCaster) {
        self.now = now;
        self.last_frame = Some(frame);

        let actions = self.tracking.poll(now);
        self.apply_tracking_actions(actions);

        if let Some(result) = self.objects.poll_load() {
            // Failures are already reported to the user by `finish_load`.
            let _ = self.finish_load(result);
        }

        self.update_environment_intensity();
        self.update_focus_square(ray_caster);
        self.objects.advance_animation(now, &mut self.scene);
    }

    /// Handles one event raised by the tracking session.
    pub fn handle_session_event(&mut self, event: SessionEvent, now: f64) {
        self.now = now;
        match event {
            SessionEvent::TrackingQualityChanged(quality) => {
                let auto_hide = !self.settings.debug_mode;
                self.tracking.on_quality_changed(quality, now, auto_hide, &mut self.notifier);
            }
            SessionEvent::AnchorAdded(anchor) => {
                self.add_plane(&anchor);
                self.check_if_object_should_move_onto_plane(&anchor);
            }
            SessionEvent::AnchorUpdated(anchor) => {
                self.planes.update(&anchor, &mut self.scene);
                self.check_if_object_should_move_onto_plane(&anchor);
            }
            SessionEvent::AnchorRemoved(id) => {
                self.planes.remove(id, &mut self.scene);
            }
            SessionEvent::Interrupted => self.tracking.on_interrupted(&mut self.notifier),
            SessionEvent::InterruptionEnded => {
                let actions = self.tracking.on_interruption_ended(&mut self.notifier);
                self.apply_tracking_actions(actions);
            }
            SessionEvent::Failed(error) => self.tracking.on_failure(&error, &mut self.notifier),
        }
    }

    /// Restarts the whole experience. Returns `false` if the restart gate is
    /// closed or an object is loading; nothing is touched in that case.
    pub fn restart_experience(&mut self) -> bool {
        if !self.tracking.begin_restart(self.now, self.objects.is_loading()) {
            return false;
        }
        info!("Restarting experience at t = {:.2}s", self.now);

        self.notifier.cancel_all_scheduled_messages();
        self.notifier.dismiss_alert();
        self.notifier.show_message("STARTING A NEW SESSION");

        self.session_config.mode = TrackingMode::SixDof;
        self.session_config.plane_detection = plane_detection_for(TrackingMode::SixDof);

        self.focus.setup(&mut self.notifier);
        self.objects.reset(&mut self.scene);
        self.restart_plane_detection();
        self.push_controls();
        true
    }

    pub fn on_alert_action(&mut self, action: AlertAction) {
        match action {
            AlertAction::Reset => {
                self.notifier.unblur_background();
                self.restart_experience();
            }
        }
    }

    fn restart_plane_detection(&mut self) {
        self.planes.clear(&mut self.scene);
        self.tracking.cancel_fallback();
        self.session_config.plane_detection = plane_detection_for(self.session_config.mode);
        self.session.run(&self.session_config, RunOptions::full_reset());
        self.notifier.schedule_message(
            "FIND A SURFACE TO PLACE AN OBJECT",
            PLACEMENT_PROMPT_SECS,
            MessageType::PlaneEstimation,
        );
    }

    fn apply_tracking_actions(&mut self, actions: Vec<TrackingAction>) {
        for action in actions {
            match action {
                TrackingAction::SwitchMode(mode) => self.set_tracking_mode(mode),
                TrackingAction::RestartSession(options) => {
                    // The session drops its anchors without reporting removals.
                    if options.remove_existing_anchors {
                        self.planes.clear(&mut self.scene);
                    }
                    self.session.run(&self.session_config, options);
                }
                TrackingAction::RestartExperience => {
                    self.restart_experience();
                }
                TrackingAction::RestartAvailable => self.push_controls(),
            }
        }
    }

    // --- Settings ---

    /// Reads the store once and threads each flag to its consumer.
    pub fn update_settings(&mut self, store: &dyn SettingsStore) {
        self.apply_settings(store.snapshot());
    }

    pub fn apply_settings(&mut self, settings: PlacementSettings) {
        let previous = self.settings;
        self.settings = settings;

        self.planes.set_debug_visuals(settings.debug_mode, &mut self.scene);
        self.toggle_ambient_light_estimation(settings.ambient_light_estimation);
        self.cascade.apply_settings(&settings);
        self.tracking.set_fallback_enabled(settings.use_3dof_fallback);

        if settings.use_3dof_tracking != previous.use_3dof_tracking {
            let mode = if settings.use_3dof_tracking {
                TrackingMode::ThreeDof
            } else {
                TrackingMode::SixDof
            };
            self.set_tracking_mode(mode);
        }
        debug!("Applied settings: {:?}", settings);
    }

    /// Re-runs the session only when the value actually changes.
    fn toggle_ambient_light_estimation(&mut self, enabled: bool) {
        if self.session_config.light_estimation == enabled {
            return;
        }
        self.session_config.light_estimation = enabled;
        self.session.run(&self.session_config, RunOptions::default());
    }

    /// Reconfigures the session. SixDOF brings plane detection back.
    pub fn set_tracking_mode(&mut self, mode: TrackingMode) {
        self.session_config.mode = mode;
        self.session_config.plane_detection = plane_detection_for(mode);
        info!("Tracking mode set to {:?}", mode);
        self.session.run(&self.session_config, RunOptions::default());
    }

    // --- Per-frame work ---

    fn update_environment_intensity(&mut self) {
        let intensity = self
            .last_frame
            .as_ref()
            .and_then(|frame| frame.light_estimate)
            .map_or(DEFAULT_ENVIRONMENT_INTENSITY, |estimate| {
                estimate.ambient_intensity / AMBIENT_INTENSITY_DIVISOR
            });
        self.scene.set_environment_intensity(intensity);
    }

    fn update_focus_square(&mut self, ray_caster: &dyn RayCaster) {
        let hit = self.cascade.resolve_world_position(
            ray_caster,
            self.screen_center,
            self.focus.last_position(),
            false,
        );
        if let Some(hit) = &hit {
            self.focus.update(hit, &mut self.notifier);
        }
        self.focus_hit = hit;
    }

    fn camera_position(&self) -> Point3<f64> {
        self.last_frame
            .as_ref()
            .map_or_else(Point3::origin, CameraFrame::camera_position)
    }

    // --- Planes ---

    fn add_plane(&mut self, anchor: &PlaneAnchor) {
        if !self.planes.add(anchor, &mut self.scene) {
            return;
        }
        let p = anchor.world_position();
        self.notifier
            .show_debug_message(&format!("NEW SURFACE DETECTED AT ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z));
        self.notifier.cancel_scheduled_message(MessageType::PlaneEstimation);
        self.notifier.show_message("SURFACE DETECTED");
        if !self.objects.has_object() {
            self.notifier.schedule_message(
                "TAP + TO PLACE AN OBJECT",
                PLACEMENT_PROMPT_SECS,
                MessageType::ContentPlacement,
            );
        }
    }

    fn check_if_object_should_move_onto_plane(&mut self, anchor: &PlaneAnchor) {
        let Some(object) = self.objects.object() else {
            return;
        };
        let Some(node) = self.scene.node_for_anchor(anchor.id) else {
            return;
        };
        let Some(local) = self.scene.convert_to_local(node, &object.position) else {
            return;
        };
        if let Some(height) = snap_target_height(anchor, &local) {
            debug!("Snapping object onto plane {:?} at y = {:.3}", anchor.id, height);
            self.notifier.show_debug_message("OBJECT MOVED\nSurface detected nearby");
            self.objects.start_height_animation(height, self.now);
        }
    }

    // --- Objects ---

    /// Starts loading `descriptor`. Rejected while another load is in flight.
    pub fn load_object(&mut self, descriptor: &ObjectDescriptor, loader: &(dyn ObjectLoader + 'static)) -> LoadRequest {
        if self.objects.is_loading() {
            return LoadRequest::Rejected;
        }
        self.notifier.cancel_scheduled_message(MessageType::ContentPlacement);
        let request = self.objects.begin_load(descriptor, loader, &mut self.scene);
        self.push_controls();
        request
    }

    /// Blocks until the in-flight load completes and places the object.
    pub fn wait_for_load(&mut self) -> Option<Result<ObjectId, LoadError>> {
        let result = self.objects.wait_for_load()?;
        Some(self.finish_load(result))
    }

    fn finish_load(&mut self, result: Result<ObjectId, LoadError>) -> Result<ObjectId, LoadError> {
        match &result {
            Ok(id) => {
                let target = self.focus.last_position().unwrap_or_else(Point3::origin);
                let camera = self.camera_position();
                self.objects.place(&camera, &target, &mut self.scene);
                info!("Placed object {:?} at the focus position", id);
            }
            Err(e) => {
                warn!("Object load failed: {}", e);
                self.notifier.show_debug_message(&format!("LOAD FAILED\n{}", e));
            }
        }
        self.push_controls();
        result
    }

    /// Moves the active object toward `request.point`. Returns the resolved hit,
    /// or `None` if the cascade found no position.
    pub fn move_object(&mut self, request: MoveRequest, ray_caster: &dyn RayCaster) -> Option<WorldHit> {
        let previous = self.objects.object().map(|o| o.position);
        let hit = self.cascade.resolve_world_position(
            ray_caster,
            request.point,
            previous,
            request.allow_infinite_plane,
        );
        let Some(hit) = hit else {
            self.notifier.show_message("CANNOT PLACE OBJECT\nTry moving left or right.");
            if !self.objects.has_object() {
                self.objects.reset(&mut self.scene);
            }
            return None;
        };

        let camera = self.camera_position();
        if request.instantly {
            self.objects.place(&camera, &hit.position, &mut self.scene);
        } else {
            self.objects.update(&camera, &hit.position, request.filtered, &mut self.scene);
        }
        self.show_object_readout();
        Some(hit)
    }

    /// Applies the orientation and scale from a rotate or pinch gesture.
    pub fn transform_object(&mut self, orientation: UnitQuaternion<f64>, scale: f64) -> bool {
        let applied = self.objects.set_transform(orientation, scale, &mut self.scene);
        if applied {
            self.show_object_readout();
        }
        applied
    }

    pub fn object_readout(&self) -> Option<ObjectReadout> {
        let object = self.objects.object()?;
        let camera = self.last_frame.as_ref()?.camera_position();
        Some(ObjectReadout {
            distance_to_camera: distance(&camera, &object.position),
            rotation_degrees: yaw_degrees(&object.orientation),
            scale: object.scale,
        })
    }

    fn show_object_readout(&mut self) {
        if let Some(readout) = self.object_readout() {
            self.notifier.show_debug_message(&readout.to_string());
        }
    }

    fn push_controls(&mut self) {
        let controls = self.controls();
        self.notifier.update_controls(controls);
    }
}

fn plane_detection_for(mode: TrackingMode) -> PlaneDetection {
    match mode {
        TrackingMode::SixDof => PlaneDetection::Horizontal,
        TrackingMode::ThreeDof => PlaneDetection::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::mocks::{MockScene, RecordingNotifier, RecordingSession, ScriptedRayCaster};
    use crate::error::{SessionError, SessionErrorCode};
    use crate::hit_test::PlaneHit;
    use crate::math::transform_from_position;
    use crate::messages::{LightEstimate, PlaneExtent};
    use crate::objects::LoadedModel;
    use crate::types::{AnchorId, LimitedReason, TrackingQuality};
    use approx::assert_abs_diff_eq;
    use crossbeam_channel::{bounded, Receiver, Sender};
    use nalgebra::Vector3;

    type TestEngine = PlacementEngine<RecordingSession, MockScene, RecordingNotifier>;

    #[derive(Debug, Clone)]
    struct GatedLoader {
        gate: Receiver<()>,
    }

    impl ObjectLoader for GatedLoader {
        fn load(&self, descriptor: &ObjectDescriptor) -> Result<LoadedModel, LoadError> {
            self.gate.recv().map_err(|_| LoadError::WorkerLost)?;
            Ok(LoadedModel {
                name: descriptor.name.clone(),
                vertex_count: 8,
            })
        }
    }

    fn gated_loader() -> (GatedLoader, Sender<()>) {
        let (sender, gate) = bounded(1);
        (GatedLoader { gate }, sender)
    }

    fn vase() -> ObjectDescriptor {
        ObjectDescriptor {
            name: "vase".into(),
            model_path: "models/vase.obj".into(),
            scale: 1.0,
        }
    }

    fn settings(fallback: bool) -> PlacementSettings {
        PlacementSettings {
            use_3dof_fallback: fallback,
            ..PlacementSettings::default()
        }
    }

    fn engine_with(settings: PlacementSettings) -> TestEngine {
        let mut engine = PlacementEngine::new(
            RecordingSession::default(),
            MockScene::default(),
            RecordingNotifier::default(),
            settings,
            ScreenPoint::new(320.0, 240.0),
        );
        engine.start(0.0);
        engine
    }

    fn frame_at(camera: Point3<f64>) -> CameraFrame {
        CameraFrame {
            pose: transform_from_position(&camera),
            tracking_quality: TrackingQuality::Normal,
            light_estimate: None,
            feature_points: None,
        }
    }

    fn floor(id: u64, height: f64) -> PlaneAnchor {
        PlaneAnchor {
            id: AnchorId(id),
            center: Vector3::zeros(),
            extent: PlaneExtent { width: 2.0, depth: 2.0 },
            transform: transform_from_position(&Point3::new(0.0, height, -1.0)),
        }
    }

    fn plane_caster(position: Point3<f64>) -> ScriptedRayCaster {
        ScriptedRayCaster {
            plane_hits: vec![PlaneHit {
                position,
                anchor: AnchorId(1),
            }],
            ..Default::default()
        }
    }

    fn loaded_engine(position: Point3<f64>) -> TestEngine {
        let mut engine = engine_with(settings(false));
        engine.tick(0.1, frame_at(Point3::origin()), &plane_caster(position));
        let (loader, release) = gated_loader();
        engine.load_object(&vase(), &loader);
        release.send(()).unwrap();
        engine.wait_for_load().unwrap().unwrap();
        engine
    }

    #[test]
    fn start_runs_plane_detection_with_a_full_reset() {
        let engine = engine_with(settings(false));
        let (config, options) = engine.session().runs[0];
        assert_eq!(config.plane_detection, PlaneDetection::Horizontal);
        assert_eq!(options, RunOptions::full_reset());
        let kinds: Vec<_> = engine.notifier().scheduled.iter().map(|s| s.2).collect();
        assert_eq!(kinds, vec![MessageType::FocusSquare, MessageType::PlaneEstimation]);
    }

    #[test]
    fn anchor_add_announces_surface_and_prompts_for_placement() {
        let mut engine = engine_with(settings(false));
        engine.handle_session_event(SessionEvent::AnchorAdded(floor(1, -1.0)), 1.0);
        let notifier = engine.notifier();
        assert_eq!(notifier.debug_messages, vec!["NEW SURFACE DETECTED AT (0.00, -1.00, -1.00)"]);
        assert!(notifier.cancelled.contains(&MessageType::PlaneEstimation));
        assert_eq!(notifier.messages, vec!["SURFACE DETECTED"]);
        let last = notifier.scheduled.last().unwrap();
        assert_eq!(last.0, "TAP + TO PLACE AN OBJECT");
        assert_eq!(last.2, MessageType::ContentPlacement);
        assert!(engine.planes().contains(AnchorId(1)));
    }

    #[test]
    fn stale_anchor_removal_changes_nothing() {
        let mut engine = engine_with(settings(false));
        let events_before = engine.notifier().event_count();
        let mutations_before = engine.scene().mutations;
        engine.handle_session_event(SessionEvent::AnchorRemoved(AnchorId(42)), 1.0);
        assert_eq!(engine.notifier().event_count(), events_before);
        assert_eq!(engine.scene().mutations, mutations_before);
    }

    #[test]
    fn limited_tracking_falls_back_to_three_dof_once() {
        let mut engine = engine_with(settings(true));
        let caster = ScriptedRayCaster::default();
        engine.handle_session_event(
            SessionEvent::TrackingQualityChanged(TrackingQuality::Limited(LimitedReason::Initializing)),
            0.0,
        );
        let runs_before = engine.session().runs.len();
        let mut t = 0.0;
        while t < 25.0 {
            t += 0.5;
            engine.tick(t, frame_at(Point3::origin()), &caster);
        }
        let new_runs = &engine.session().runs[runs_before..];
        assert_eq!(new_runs.len(), 1);
        assert_eq!(new_runs[0].0.mode, TrackingMode::ThreeDof);
        assert_eq!(new_runs[0].0.plane_detection, PlaneDetection::None);
    }

    #[test]
    fn restart_while_loading_is_a_no_op() {
        let mut engine = engine_with(settings(false));
        let (loader, release) = gated_loader();
        assert!(matches!(engine.load_object(&vase(), &loader), LoadRequest::Started(_)));
        assert!(!engine.controls().restart);
        assert_eq!(engine.load_object(&vase(), &loader), LoadRequest::Rejected);

        let mutations = engine.scene().mutations;
        let runs = engine.session().runs.len();
        assert!(!engine.restart_experience());
        assert_eq!(engine.scene().mutations, mutations);
        assert_eq!(engine.session().runs.len(), runs);

        release.send(()).unwrap();
        assert!(engine.wait_for_load().unwrap().is_ok());
        assert!(engine.controls().add_object);
    }

    #[test]
    fn load_completion_places_object_at_focus_position() {
        let engine = loaded_engine(Point3::new(0.5, -1.0, -1.5));
        let object = engine.objects().object().unwrap();
        assert_eq!(object.position, Point3::new(0.5, -1.0, -1.5));
        assert!(engine.scene().is_object_attached(object.id));
        assert!(engine.objects().smoother().history().is_empty());
    }

    #[test]
    fn missed_placement_without_object_resets_selection() {
        let mut engine = engine_with(settings(false));
        let hit = engine.move_object(
            MoveRequest::tap(ScreenPoint::new(10.0, 10.0)),
            &ScriptedRayCaster::default(),
        );
        assert!(hit.is_none());
        assert_eq!(
            engine.notifier().messages.last().unwrap(),
            "CANNOT PLACE OBJECT\nTry moving left or right."
        );
        assert!(!engine.objects().has_object());
    }

    #[test]
    fn drag_moves_object_and_reports_readout() {
        let mut engine = loaded_engine(Point3::new(0.0, -1.0, -1.0));
        let hit = engine
            .move_object(
                MoveRequest::drag(ScreenPoint::new(300.0, 200.0)),
                &plane_caster(Point3::new(0.0, -1.0, -2.0)),
            )
            .unwrap();
        assert_eq!(hit.anchor, Some(AnchorId(1)));
        assert_eq!(engine.objects().smoother().history().len(), 1);

        let readout = engine.object_readout().unwrap();
        assert_abs_diff_eq!(readout.distance_to_camera, 5.0_f64.sqrt(), epsilon = 1e-9);
        assert_eq!(readout.rotation_degrees, 0);
        assert_eq!(
            engine.notifier().debug_messages.last().unwrap(),
            "Distance: 2.24 m\nRotation: 0°\nScale: 1.00x"
        );
    }

    #[test]
    fn anchor_update_snaps_object_onto_refined_plane() {
        let mut engine = loaded_engine(Point3::new(0.0, -0.98, -1.0));
        engine.handle_session_event(SessionEvent::AnchorAdded(floor(1, -0.9)), 1.0);
        assert!(engine.objects().animation().is_none());

        engine.handle_session_event(SessionEvent::AnchorUpdated(floor(1, -1.0)), 2.0);
        assert_eq!(
            engine.notifier().debug_messages.last().unwrap(),
            "OBJECT MOVED\nSurface detected nearby"
        );
        engine.tick(2.6, frame_at(Point3::origin()), &ScriptedRayCaster::default());
        assert_eq!(engine.objects().object().unwrap().position.y, -1.0);
    }

    #[test]
    fn interruption_end_resets_session_and_restarts() {
        let mut engine = engine_with(settings(false));
        engine.handle_session_event(SessionEvent::AnchorAdded(floor(1, -1.0)), 1.0);
        engine.handle_session_event(SessionEvent::Interrupted, 2.0);
        assert!(engine.notifier().blurred);

        let runs = engine.session().runs.len();
        engine.handle_session_event(SessionEvent::InterruptionEnded, 3.0);
        let new_runs = &engine.session().runs[runs..];
        assert_eq!(new_runs.len(), 2);
        assert!(new_runs.iter().all(|(_, options)| *options == RunOptions::full_reset()));
        assert!(!engine.notifier().blurred);
        assert!(engine.planes().is_empty());
        let messages = &engine.notifier().messages;
        assert!(messages.contains(&"RESETTING SESSION".to_string()));
        assert_eq!(messages.last().unwrap(), "STARTING A NEW SESSION");
        assert!(!engine.controls().restart);
    }

    #[test]
    fn interruption_ending_mid_load_still_drops_planes() {
        let mut engine = engine_with(settings(false));
        engine.handle_session_event(SessionEvent::AnchorAdded(floor(1, -1.0)), 1.0);
        let (loader, release) = gated_loader();
        assert!(matches!(engine.load_object(&vase(), &loader), LoadRequest::Started(_)));

        engine.handle_session_event(SessionEvent::Interrupted, 2.0);
        let runs = engine.session().runs.len();
        engine.handle_session_event(SessionEvent::InterruptionEnded, 3.0);

        // The restart itself is refused while loading, but the session reset went out.
        assert_eq!(engine.session().runs.len(), runs + 1);
        assert!(engine.planes().is_empty());
        assert!(engine.scene().anchors.is_empty());
        assert!(engine.scene().planes.is_empty());

        engine.handle_session_event(SessionEvent::AnchorAdded(floor(1, -1.0)), 4.0);
        assert!(engine.planes().contains(AnchorId(1)));
        assert_eq!(engine.notifier().messages.last().unwrap(), "SURFACE DETECTED");

        release.send(()).unwrap();
        assert!(engine.wait_for_load().unwrap().is_ok());
    }

    #[test]
    fn interruption_ending_inside_restart_grace_drops_planes() {
        let mut engine = engine_with(settings(false));
        engine.tick(0.5, frame_at(Point3::origin()), &ScriptedRayCaster::default());
        assert!(engine.restart_experience());

        engine.handle_session_event(SessionEvent::AnchorAdded(floor(2, -1.0)), 1.0);
        engine.handle_session_event(SessionEvent::Interrupted, 1.5);
        let runs = engine.session().runs.len();
        engine.handle_session_event(SessionEvent::InterruptionEnded, 2.0);

        assert_eq!(engine.session().runs.len(), runs + 1);
        assert_eq!(engine.session().runs.last().unwrap().1, RunOptions::full_reset());
        assert!(engine.planes().is_empty());
        assert!(!engine.scene().anchors.contains_key(&AnchorId(2)));
    }

    #[test]
    fn transform_gesture_updates_object_and_readout() {
        let mut engine = engine_with(settings(false));
        let quarter_turn = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
        assert!(!engine.transform_object(quarter_turn, 2.0));

        let mut engine = loaded_engine(Point3::new(0.0, -1.0, -1.0));
        assert!(engine.transform_object(quarter_turn, 2.0));
        let object = engine.objects().object().unwrap();
        assert_abs_diff_eq!(object.scale, 2.0);

        let readout = engine.object_readout().unwrap();
        assert_eq!(readout.rotation_degrees, 90);
        assert_abs_diff_eq!(readout.scale, 2.0);
        assert_eq!(
            engine.notifier().debug_messages.last().unwrap(),
            &readout.to_string()
        );
    }

    #[test]
    fn recoverable_failure_reset_action_restarts() {
        let mut engine = engine_with(settings(false));
        engine.handle_session_event(
            SessionEvent::Failed(SessionError::new(SessionErrorCode::WorldTrackingFailed, "Lost.")),
            1.0,
        );
        assert!(engine.notifier().blurred);
        assert_eq!(engine.notifier().alerts[0].actions, vec![AlertAction::Reset]);

        engine.on_alert_action(AlertAction::Reset);
        assert!(!engine.notifier().blurred);
        assert_eq!(engine.notifier().dismissed, 1);
        assert_eq!(engine.notifier().cancel_all_count, 1);
    }

    #[test]
    fn restart_returns_to_six_dof_and_reopens_after_grace() {
        let mut engine = engine_with(settings(false));
        engine.set_tracking_mode(TrackingMode::ThreeDof);
        engine.tick(1.0, frame_at(Point3::origin()), &ScriptedRayCaster::default());
        assert!(engine.restart_experience());
        assert_eq!(engine.session_config().mode, TrackingMode::SixDof);
        assert_eq!(engine.session_config().plane_detection, PlaneDetection::Horizontal);
        assert!(!engine.restart_experience());

        engine.tick(6.0, frame_at(Point3::origin()), &ScriptedRayCaster::default());
        assert!(engine.controls().restart);
        assert!(engine.notifier().controls.last().unwrap().restart);
    }

    #[test]
    fn environment_intensity_follows_light_estimate() {
        let mut engine = engine_with(settings(false));
        let caster = ScriptedRayCaster::default();
        engine.tick(0.1, frame_at(Point3::origin()), &caster);
        assert_eq!(engine.scene().environment_intensity, Some(25.0));

        let mut frame = frame_at(Point3::origin());
        frame.light_estimate = Some(LightEstimate { ambient_intensity: 800.0 });
        engine.tick(0.2, frame, &caster);
        assert_eq!(engine.scene().environment_intensity, Some(20.0));
    }

    #[test]
    fn light_estimation_toggle_reruns_session_only_on_change() {
        let mut engine = engine_with(settings(false));
        let runs = engine.session().runs.len();
        engine.apply_settings(settings(false));
        assert_eq!(engine.session().runs.len(), runs);

        engine.apply_settings(PlacementSettings {
            ambient_light_estimation: false,
            ..settings(false)
        });
        assert_eq!(engine.session().runs.len(), runs + 1);
        assert!(!engine.session().runs.last().unwrap().0.light_estimation);
    }

    #[test]
    fn three_dof_setting_round_trips_to_world_tracking() {
        let mut engine = engine_with(settings(false));
        engine.apply_settings(PlacementSettings {
            use_3dof_tracking: true,
            ..settings(false)
        });
        assert_eq!(engine.session_config().mode, TrackingMode::ThreeDof);
        engine.apply_settings(settings(false));
        assert_eq!(engine.session_config().mode, TrackingMode::SixDof);
        assert_eq!(engine.session_config().plane_detection, PlaneDetection::Horizontal);
    }

    #[test]
    fn hit_test_visualization_is_gated_by_setting() {
        let caster = plane_caster(Point3::new(0.0, 0.0, -1.0));

        let mut engine = engine_with(settings(false));
        engine.tick(0.1, frame_at(Point3::new(0.0, 1.0, 0.0)), &caster);
        assert!(engine.hit_test_visualization().is_none());

        engine.apply_settings(PlacementSettings {
            show_hit_test_visualization: true,
            ..settings(false)
        });
        engine.tick(0.2, frame_at(Point3::new(0.0, 1.0, 0.0)), &caster);
        let hit = engine.hit_test_visualization().unwrap();
        assert_abs_diff_eq!(hit.position.z, -1.0);
    }
}
