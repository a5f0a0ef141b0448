// tether_core/src/types.rs

use nalgebra::{Matrix4, Point2};
use serde::Deserialize;

// --- Core Type Aliases ---
/// A 4x4 homogeneous transform. Column 3 holds the translation.
pub type Transform = Matrix4<f64>;
/// A point in screen space, in pixels.
pub type ScreenPoint = Point2<f64>;

// --- Core Identifiers ---

/// Stable identity of a detected surface, as reported by the tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Deserialize)]
pub struct AnchorId(pub u64);

/// Opaque handle to a node in the host's scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeHandle(pub u64);

/// Identity of a virtual object instance. A fresh id is minted for every load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectId(pub u64);

// --- Tracking Vocabulary ---

/// Why the tracking subsystem currently reports reduced quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum LimitedReason {
    Initializing,
    ExcessiveMotion,
    InsufficientFeatures,
}

/// How well the camera pose is currently being estimated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub enum TrackingQuality {
    NotAvailable,
    Limited(LimitedReason),
    Normal,
}

impl TrackingQuality {
    /// The short status line shown to the user when quality changes.
    pub fn presentation_text(&self) -> &'static str {
        match self {
            TrackingQuality::NotAvailable => "TRACKING UNAVAILABLE",
            TrackingQuality::Normal => "TRACKING NORMAL",
            TrackingQuality::Limited(LimitedReason::Initializing) => "TRACKING LIMITED\nInitializing",
            TrackingQuality::Limited(LimitedReason::ExcessiveMotion) => {
                "TRACKING LIMITED\nToo much camera movement"
            }
            TrackingQuality::Limited(LimitedReason::InsufficientFeatures) => {
                "TRACKING LIMITED\nNot enough surface detail"
            }
        }
    }

    /// The stronger wording used once a degraded state has persisted.
    pub fn escalation_text(&self) -> &'static str {
        match self {
            TrackingQuality::NotAvailable => {
                "TRACKING UNAVAILABLE\nTry restarting the session or moving to another area."
            }
            TrackingQuality::Limited(LimitedReason::ExcessiveMotion) => {
                "TRACKING LIMITED\nTry slowing down your movement, or reset the session."
            }
            TrackingQuality::Limited(LimitedReason::InsufficientFeatures) => {
                "TRACKING LIMITED\nTry pointing at a flat surface, or reset the session."
            }
            TrackingQuality::Limited(LimitedReason::Initializing) => {
                "TRACKING LIMITED\nStill initializing. Keep moving slowly."
            }
            TrackingQuality::Normal => "",
        }
    }

    pub fn is_limited(&self) -> bool {
        matches!(self, TrackingQuality::Limited(_))
    }
}

/// Tracking fidelity. Changing it reconfigures and restarts the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
pub enum TrackingMode {
    /// Full world tracking: rotation and translation, with plane detection.
    #[default]
    SixDof,
    /// Orientation-only tracking. No plane detection.
    ThreeDof,
}
