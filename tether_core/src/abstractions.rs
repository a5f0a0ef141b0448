// tether_core/src/abstractions.rs

//! The collaborator contracts the engine is given by its host.
//!
//! The core never owns a camera, a renderer or a UI. Everything it needs from the
//! outside world comes through these traits, and the Bevy simulation crate (or a
//! mock, in tests) implements them.

use nalgebra::Point3;

use crate::config::PlacementSettings;
use crate::error::LoadError;
use crate::hit_test::{FeatureHit, FeatureHitQuery, PlaneHit};
use crate::messages::{
    Alert, ControlAvailability, MessageType, PlaneAnchor, RunOptions, SessionConfig,
};
use crate::objects::{LoadedModel, ObjectDescriptor, VirtualObject};
use crate::planes::Plane;
use crate::types::{AnchorId, NodeHandle, ObjectId, ScreenPoint, TrackingQuality};

// --- TRACKING SESSION ---
/// Accepts (re)configuration requests. Frames and lifecycle events flow the other
/// way, pushed into the engine by the host.
pub trait TrackingSession: Send + Sync {
    /// Runs (or re-runs) the session with `config`.
    fn run(&mut self, config: &SessionConfig, options: RunOptions);
}

// --- RAY-CAST SURFACE ---
/// Ray casts from a screen point into the tracked world, evaluated against the
/// current frame.
pub trait RayCaster {
    /// Hits against known plane anchors, limited to their measured extent.
    /// Nearest hit first.
    fn hit_test_planes(&self, point: ScreenPoint) -> Vec<PlaneHit>;

    /// Hits against the feature-point cloud. Best hit first.
    fn hit_test_features(&self, point: ScreenPoint, query: &FeatureHitQuery) -> Vec<FeatureHit>;

    /// Intersection with an unbounded horizontal plane through `point_on_plane`.
    fn hit_test_infinite_plane(
        &self,
        point: ScreenPoint,
        point_on_plane: &Point3<f64>,
    ) -> Option<Point3<f64>>;
}

// --- SCENE GRAPH ---
/// The host's scene graph. Every mutation is issued from the synchronized
/// per-frame context.
pub trait SceneGraph: Send + Sync {
    /// Creates or refreshes the node that follows `anchor`'s transform.
    fn sync_anchor_node(&mut self, anchor: &PlaneAnchor) -> NodeHandle;
    fn remove_anchor_node(&mut self, anchor: AnchorId);
    fn node_for_anchor(&self, anchor: AnchorId) -> Option<NodeHandle>;

    fn attach_plane(&mut self, parent: NodeHandle, plane: &Plane);
    fn update_plane(&mut self, plane: &Plane);
    fn detach_plane(&mut self, anchor: AnchorId);

    /// Attaches the object under the root node.
    fn attach_object(&mut self, object: &VirtualObject);
    fn detach_object(&mut self, object: ObjectId);
    fn is_object_attached(&self, object: ObjectId) -> bool;
    /// Pushes the object's current position, orientation and scale to its node.
    fn sync_object(&mut self, object: &VirtualObject);

    /// Converts a world position into `node`'s local space.
    fn convert_to_local(&self, node: NodeHandle, world: &Point3<f64>) -> Option<Point3<f64>>;

    fn set_environment_intensity(&mut self, intensity: f64);
}

// --- MESSAGING ---
/// User-facing messages, alerts and backdrop effects.
pub trait Notifier: Send + Sync {
    fn show_message(&mut self, text: &str);
    fn show_debug_message(&mut self, text: &str);
    /// Schedules `text` to appear after `delay_secs`, replacing any message
    /// already scheduled under `kind`.
    fn schedule_message(&mut self, text: &str, delay_secs: f64, kind: MessageType);
    fn cancel_scheduled_message(&mut self, kind: MessageType);
    fn cancel_all_scheduled_messages(&mut self);
    fn show_tracking_quality(&mut self, quality: TrackingQuality, auto_hide: bool);
    fn show_alert(&mut self, alert: Alert);
    fn dismiss_alert(&mut self);
    fn blur_background(&mut self);
    fn unblur_background(&mut self);
    fn update_controls(&mut self, controls: ControlAvailability);

    /// Schedules the stronger warning for a degraded tracking state.
    fn escalate_feedback(&mut self, quality: TrackingQuality, delay_secs: f64) {
        self.schedule_message(
            quality.escalation_text(),
            delay_secs,
            MessageType::TrackingStateEscalation,
        );
    }
}

// --- SETTINGS ---
pub trait SettingsStore: Send + Sync {
    fn snapshot(&self) -> PlacementSettings;
}

// --- ASSET LOADING ---
/// Loads an object's model. Called on a background worker, so implementations
/// must be cloneable into that worker.
pub trait ObjectLoader: Send + Sync + dyn_clone::DynClone {
    fn load(&self, descriptor: &ObjectDescriptor) -> Result<LoadedModel, LoadError>;
}

// Make the trait object cloneable.
dyn_clone::clone_trait_object!(ObjectLoader);
