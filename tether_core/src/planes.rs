// tether_core/src/planes.rs

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::abstractions::SceneGraph;
use crate::config::{SNAP_EXTENT_TOLERANCE, SNAP_VERTICAL_ALLOWANCE};
use crate::messages::{PlaneAnchor, PlaneExtent};
use crate::types::{AnchorId, Transform};

// =========================================================================
// == Plane Representation ==
// =========================================================================

/// The in-scene representation of a detected surface, kept in sync with its anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    anchor: AnchorId,
    pub center: Vector3<f64>,
    pub extent: PlaneExtent,
    pub transform: Transform,
    pub show_debug: bool,
}

impl Plane {
    pub fn new(anchor: &PlaneAnchor, show_debug: bool) -> Self {
        Self {
            anchor: anchor.id,
            center: anchor.center,
            extent: anchor.extent,
            transform: anchor.transform,
            show_debug,
        }
    }

    pub fn anchor(&self) -> AnchorId {
        self.anchor
    }

    /// Refreshes geometry from the anchor's latest estimate.
    pub fn update(&mut self, anchor: &PlaneAnchor) {
        self.center = anchor.center;
        self.extent = anchor.extent;
        self.transform = anchor.transform;
    }
}

// =========================================================================
// == Registry ==
// =========================================================================

/// Owns the one-to-one mapping from live anchor identity to its `Plane`.
#[derive(Debug, Default)]
pub struct PlaneRegistry {
    planes: HashMap<AnchorId, Plane>,
    show_debug: bool,
}

impl PlaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug_visuals(show_debug: bool) -> Self {
        Self {
            planes: HashMap::new(),
            show_debug,
        }
    }

    /// Registers a plane for `anchor` and attaches it under the anchor's node.
    /// Returns `false` if the anchor was already registered; in that case its
    /// plane is refreshed in place instead of duplicated.
    pub fn add(&mut self, anchor: &PlaneAnchor, scene: &mut dyn SceneGraph) -> bool {
        let node = scene.sync_anchor_node(anchor);
        if let Some(plane) = self.planes.get_mut(&anchor.id) {
            plane.update(anchor);
            scene.update_plane(plane);
            return false;
        }

        let plane = Plane::new(anchor, self.show_debug);
        scene.attach_plane(node, &plane);
        self.planes.insert(anchor.id, plane);
        debug!("Registered plane for anchor {:?} ({} live)", anchor.id, self.planes.len());
        true
    }

    /// Refreshes a registered plane. Unknown anchors are ignored.
    pub fn update(&mut self, anchor: &PlaneAnchor, scene: &mut dyn SceneGraph) -> bool {
        let Some(plane) = self.planes.get_mut(&anchor.id) else {
            return false;
        };
        scene.sync_anchor_node(anchor);
        plane.update(anchor);
        scene.update_plane(plane);
        true
    }

    /// Detaches and discards a plane. Unknown anchors are ignored.
    pub fn remove(&mut self, anchor: AnchorId, scene: &mut dyn SceneGraph) -> bool {
        if self.planes.remove(&anchor).is_none() {
            return false;
        }
        scene.detach_plane(anchor);
        scene.remove_anchor_node(anchor);
        debug!("Removed plane for anchor {:?} ({} live)", anchor, self.planes.len());
        true
    }

    /// Detaches every plane, e.g. when the session discards its anchors.
    pub fn clear(&mut self, scene: &mut dyn SceneGraph) {
        for (anchor, _) in self.planes.drain() {
            scene.detach_plane(anchor);
            scene.remove_anchor_node(anchor);
        }
    }

    /// Toggles debug visuals on every plane and re-syncs them.
    pub fn set_debug_visuals(&mut self, show: bool, scene: &mut dyn SceneGraph) {
        if self.show_debug == show {
            return;
        }
        self.show_debug = show;
        for plane in self.planes.values_mut() {
            plane.show_debug = show;
            scene.update_plane(plane);
        }
    }

    pub fn get(&self, anchor: AnchorId) -> Option<&Plane> {
        self.planes.get(&anchor)
    }

    pub fn contains(&self, anchor: AnchorId) -> bool {
        self.planes.contains_key(&anchor)
    }

    pub fn len(&self) -> usize {
        self.planes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}

// =========================================================================
// == Snap-To-Surface ==
// =========================================================================

/// Decides whether an object at `local` (in the anchor's frame) should drop onto
/// the anchor's plane. Returns the world height to move to.
///
/// The object must sit inside the plane's extent grown by 10% on each side, and
/// within ±3 cm of it vertically. A local height of exactly zero means the object
/// is already on the plane.
pub fn snap_target_height(anchor: &PlaneAnchor, local: &Point3<f64>) -> Option<f64> {
    if local.y == 0.0 {
        return None;
    }

    let tolerance_x = anchor.extent.width * SNAP_EXTENT_TOLERANCE;
    let tolerance_z = anchor.extent.depth * SNAP_EXTENT_TOLERANCE;
    let min_x = anchor.center.x - anchor.extent.width / 2.0 - tolerance_x;
    let max_x = anchor.center.x + anchor.extent.width / 2.0 + tolerance_x;
    let min_z = anchor.center.z - anchor.extent.depth / 2.0 - tolerance_z;
    let max_z = anchor.center.z + anchor.extent.depth / 2.0 + tolerance_z;

    if local.x < min_x || local.x > max_x || local.z < min_z || local.z > max_z {
        return None;
    }

    if local.y > -SNAP_VERTICAL_ALLOWANCE && local.y < SNAP_VERTICAL_ALLOWANCE {
        Some(anchor.world_height())
    } else {
        None
    }
}
