// tether_core/src/messages.rs

use crate::error::SessionError;
use crate::math::position_from_transform;
use crate::types::{AnchorId, TrackingMode, TrackingQuality, Transform};
use nalgebra::{Point3, Vector3};

// =========================================================================
// == Per-Frame Tracking Data ==
// =========================================================================

/// Ambient lighting measured by the tracking subsystem for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightEstimate {
    /// Ambient intensity in lumens. About 1000 for a well-lit scene.
    pub ambient_intensity: f64,
}

/// One tracking tick's worth of camera state. Read-only to the core and
/// superseded by the next frame.
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Camera-to-world pose.
    pub pose: Transform,
    pub tracking_quality: TrackingQuality,
    pub light_estimate: Option<LightEstimate>,
    /// Reconstructed feature points, in world space.
    pub feature_points: Option<Vec<Point3<f64>>>,
}

impl CameraFrame {
    pub fn camera_position(&self) -> Point3<f64> {
        position_from_transform(&self.pose)
    }

    pub fn feature_count(&self) -> usize {
        self.feature_points.as_ref().map_or(0, Vec::len)
    }
}

// =========================================================================
// == Surfaces ==
// =========================================================================

/// Horizontal size of a detected plane, in its local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneExtent {
    /// Size along local X.
    pub width: f64,
    /// Size along local Z.
    pub depth: f64,
}

/// A flat surface detected by the tracking subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneAnchor {
    pub id: AnchorId,
    /// Center of the detected extent, in plane-local coordinates.
    pub center: Vector3<f64>,
    pub extent: PlaneExtent,
    /// Plane-local to world.
    pub transform: Transform,
}

impl PlaneAnchor {
    pub fn world_position(&self) -> Point3<f64> {
        position_from_transform(&self.transform)
    }

    /// World height of the plane's origin.
    pub fn world_height(&self) -> f64 {
        self.transform[(1, 3)]
    }
}

// =========================================================================
// == Session Lifecycle ==
// =========================================================================

/// Everything the tracking session can report, delivered serially relative to
/// each other and to the per-frame tick.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    TrackingQualityChanged(TrackingQuality),
    AnchorAdded(PlaneAnchor),
    AnchorUpdated(PlaneAnchor),
    AnchorRemoved(AnchorId),
    Interrupted,
    InterruptionEnded,
    Failed(SessionError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaneDetection {
    #[default]
    None,
    Horizontal,
}

/// The configuration a session is (re)started with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub mode: TrackingMode,
    pub light_estimation: bool,
    /// Only honoured in SixDOF mode.
    pub plane_detection: PlaneDetection,
}

/// Options applied when (re)running a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunOptions {
    pub reset_tracking: bool,
    pub remove_existing_anchors: bool,
}

impl RunOptions {
    /// Discard all anchors and tracking history.
    pub fn full_reset() -> Self {
        Self {
            reset_tracking: true,
            remove_existing_anchors: true,
        }
    }
}

// =========================================================================
// == User-Facing Messaging ==
// =========================================================================

/// Tag for scheduled messages. At most one scheduled message exists per tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    TrackingStateEscalation,
    PlaneEstimation,
    ContentPlacement,
    FocusSquare,
}

/// An action the user can pick from an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertAction {
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    pub actions: Vec<AlertAction>,
}

/// Which competing UI actions are currently allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlAvailability {
    pub add_object: bool,
    pub settings: bool,
    pub screenshot: bool,
    pub restart: bool,
}
