// tether_core/src/prelude.rs

// --- Collaborator Contracts (what the host must provide) ---
pub use crate::abstractions::{
    Notifier, ObjectLoader, RayCaster, SceneGraph, SettingsStore, TrackingSession,
};

// --- Data Flowing In and Out (the "nouns" of the library) ---
pub use crate::messages::{
    Alert, AlertAction, CameraFrame, ControlAvailability, LightEstimate, MessageType,
    PlaneAnchor, PlaneDetection, PlaneExtent, RunOptions, SessionConfig, SessionEvent,
};
pub use crate::types::{
    AnchorId, LimitedReason, NodeHandle, ObjectId, ScreenPoint, TrackingMode, TrackingQuality,
    Transform,
};

// --- Configuration & Errors ---
pub use crate::config::PlacementSettings;
pub use crate::error::{LoadError, SessionError, SessionErrorCode};

// --- The Engine and its Parts ---
pub use crate::engine::{MoveRequest, ObjectReadout, PlacementEngine};
pub use crate::hit_test::{FeatureHit, FeatureHitQuery, HitSource, HitTestCascade, PlaneHit, WorldHit};
pub use crate::objects::{LoadRequest, LoadedModel, ObjectDescriptor, VirtualObject};
pub use crate::planes::Plane;
