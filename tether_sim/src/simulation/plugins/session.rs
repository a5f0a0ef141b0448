// tether_sim/src/simulation/plugins/session.rs

//! The simulated tracking session.
//!
//! The engine talks to the session through [`SimTrackingSession`], which only
//! queues run requests. Everything the session reports back (quality changes,
//! surface anchors, interruptions, failures) is scripted by the scenario
//! timeline and published as [`BevySessionEvent`]s.

use crossbeam_channel::{Receiver, Sender};
use nalgebra::{Translation3, Vector3};
use std::collections::BTreeMap;

use crate::prelude::*;
use crate::simulation::config::structs::{SurfaceConfig, TimelineEvent, WorldConfig};
use crate::simulation::core::events::{BevySessionEvent, UserInput};

// =========================================================================
// == Session Handle & State ==
// =========================================================================

/// One call to `TrackingSession::run`, waiting to be applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionRequest {
    pub config: SessionConfig,
    pub options: RunOptions,
}

/// The engine's handle on the simulated session.
#[derive(Debug, Clone)]
pub struct SimTrackingSession {
    requests: Sender<SessionRequest>,
}

impl SimTrackingSession {
    pub fn channel() -> (Self, SessionRequestQueue) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (Self { requests: sender }, SessionRequestQueue(receiver))
    }
}

impl TrackingSession for SimTrackingSession {
    fn run(&mut self, config: &SessionConfig, options: RunOptions) {
        let request = SessionRequest {
            config: *config,
            options,
        };
        if self.requests.send(request).is_err() {
            warn!("Session request queue is closed, dropping {:?}", request);
        }
    }
}

/// The receiving end of the engine's run requests.
#[derive(Resource)]
pub struct SessionRequestQueue(pub Receiver<SessionRequest>);

/// What the simulated session currently believes about the world.
#[derive(Resource, Debug, Clone)]
pub struct SimSessionState {
    pub config: SessionConfig,
    pub running: bool,
    pub run_count: usize,
    pub quality: TrackingQuality,
    pub interrupted: bool,
    /// Anchors reported to the engine and not yet removed.
    pub anchors: BTreeMap<AnchorId, PlaneAnchor>,
}

impl Default for SimSessionState {
    fn default() -> Self {
        Self {
            config: SessionConfig::default(),
            running: false,
            run_count: 0,
            quality: TrackingQuality::NotAvailable,
            interrupted: false,
            anchors: BTreeMap::new(),
        }
    }
}

impl SimSessionState {
    /// Applies a run request. Returns the quality change a tracking reset causes.
    pub fn apply(&mut self, request: &SessionRequest) -> Option<TrackingQuality> {
        self.config = request.config;
        self.running = true;
        self.run_count += 1;
        if request.options.remove_existing_anchors {
            self.anchors.clear();
        }
        let initializing = TrackingQuality::Limited(LimitedReason::Initializing);
        if request.options.reset_tracking && self.quality != initializing {
            self.quality = initializing;
            return Some(initializing);
        }
        None
    }

    fn detects_planes(&self) -> bool {
        self.config.mode == TrackingMode::SixDof
            && self.config.plane_detection == PlaneDetection::Horizontal
    }
}

/// Index of the next timeline entry to dispatch.
#[derive(Resource, Debug, Default)]
pub struct TimelineCursor(pub usize);

// =========================================================================
// == Plugin ==
// =========================================================================

pub struct SessionPlugin;

impl Plugin for SessionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SimSessionState>()
            .init_resource::<TimelineCursor>()
            .add_systems(
                Update,
                (apply_session_requests, dispatch_timeline)
                    .chain()
                    .in_set(SimulationSet::Session),
            );
    }
}

// =========================================================================
// == Runtime Systems ==
// =========================================================================

fn apply_session_requests(
    queue: Option<Res<SessionRequestQueue>>,
    mut state: ResMut<SimSessionState>,
    mut session_events: EventWriter<BevySessionEvent>,
) {
    let Some(queue) = queue else {
        return;
    };
    for request in queue.0.try_iter() {
        debug!(
            "Session run #{}: {:?} with {:?}",
            state.run_count + 1,
            request.config,
            request.options
        );
        if let Some(quality) = state.apply(&request) {
            session_events.write(BevySessionEvent(SessionEvent::TrackingQualityChanged(quality)));
        }
    }
}

pub(crate) fn dispatch_timeline(
    time: Res<Time>,
    config: Res<ScenarioConfig>,
    mut cursor: ResMut<TimelineCursor>,
    mut state: ResMut<SimSessionState>,
    mut session_events: EventWriter<BevySessionEvent>,
    mut user_input: EventWriter<UserInput>,
) {
    let now = time.elapsed_secs_f64();
    while let Some(entry) = config.timeline.get(cursor.0) {
        if entry.at > now {
            break;
        }
        cursor.0 += 1;
        debug!("[t={:.2}] timeline: {:?}", now, entry.event);
        match translate_event(&entry.event, &config.world, &mut state) {
            Some(Dispatch::Session(event)) => {
                session_events.write(BevySessionEvent(event));
            }
            Some(Dispatch::User(input)) => {
                user_input.write(input);
            }
            None => {}
        }
    }
}

// =========================================================================
// == Timeline Translation ==
// =========================================================================

/// Where a timeline event is delivered.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Session(SessionEvent),
    User(UserInput),
}

/// Turns a scripted event into what the session or the user actually does,
/// updating the session's view of the world on the way. `None` means the
/// session would not report it (e.g. a surface while plane detection is off).
pub fn translate_event(
    event: &TimelineEvent,
    world: &WorldConfig,
    state: &mut SimSessionState,
) -> Option<Dispatch> {
    let session = |event| Some(Dispatch::Session(event));
    let user = |input| Some(Dispatch::User(input));

    match event {
        TimelineEvent::TrackingQuality { quality } => {
            state.quality = *quality;
            session(SessionEvent::TrackingQualityChanged(*quality))
        }
        TimelineEvent::AnchorAdded {
            id,
            surface,
            height_error,
            coverage,
        }
        | TimelineEvent::AnchorUpdated {
            id,
            surface,
            height_error,
            coverage,
        } => {
            if !state.detects_planes() {
                debug!("Plane detection is off, dropping anchor {}", id);
                return None;
            }
            let Some(surface) = world.surfaces.iter().find(|s| &s.name == surface) else {
                warn!("Timeline names unknown surface '{}'", surface);
                return None;
            };
            let anchor = anchor_from_surface(AnchorId(*id), surface, *height_error, *coverage);
            // A refinement of an anchor the session no longer has is a new detection.
            let known = state.anchors.insert(anchor.id, anchor.clone()).is_some();
            if known {
                session(SessionEvent::AnchorUpdated(anchor))
            } else {
                session(SessionEvent::AnchorAdded(anchor))
            }
        }
        TimelineEvent::AnchorRemoved { id } => {
            let id = AnchorId(*id);
            state
                .anchors
                .remove(&id)
                .map(|_| Dispatch::Session(SessionEvent::AnchorRemoved(id)))
        }
        TimelineEvent::Interrupted => {
            state.interrupted = true;
            session(SessionEvent::Interrupted)
        }
        TimelineEvent::InterruptionEnded => {
            state.interrupted = false;
            session(SessionEvent::InterruptionEnded)
        }
        TimelineEvent::Failed {
            code,
            description,
            failure_reason,
            recovery_suggestions,
        } => {
            state.running = false;
            session(SessionEvent::Failed(SessionError {
                code: *code,
                description: description.clone(),
                failure_reason: failure_reason.clone(),
                recovery_suggestions: recovery_suggestions.clone(),
            }))
        }
        TimelineEvent::LoadObject { name } => user(UserInput::LoadObject { name: name.clone() }),
        TimelineEvent::TransformObject { yaw_deg, scale } => user(UserInput::TransformObject {
            yaw_deg: *yaw_deg,
            scale: *scale,
        }),
        TimelineEvent::Tap { x, y } => user(UserInput::Tap(ScreenPoint::new(*x, *y))),
        TimelineEvent::Drag { x, y } => user(UserInput::Drag(ScreenPoint::new(*x, *y))),
        TimelineEvent::Restart => user(UserInput::Restart),
        TimelineEvent::AlertReset => user(UserInput::AlertReset),
        TimelineEvent::UpdateSettings { settings } => user(UserInput::UpdateSettings(*settings)),
    }
}

/// The anchor the session reports for a ground-truth surface. The first height
/// estimate may be off by `height_error`, and only `coverage` of the extent may
/// have been seen so far.
pub fn anchor_from_surface(
    id: AnchorId,
    surface: &SurfaceConfig,
    height_error: f64,
    coverage: f64,
) -> PlaneAnchor {
    let [x, y, z] = surface.center;
    let coverage = coverage.clamp(0.0, 1.0);
    PlaneAnchor {
        id,
        center: Vector3::zeros(),
        extent: PlaneExtent {
            width: surface.size[0] * coverage,
            depth: surface.size[1] * coverage,
        },
        transform: Translation3::new(x, y + height_error, z).to_homogeneous(),
    }
}
