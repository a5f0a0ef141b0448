// tether_sim/src/simulation/core/transforms.rs

use bevy::prelude::{Quat as BevyQuat, Transform as BevyTransform, Vec3 as BevyVec3};
use nalgebra::{Isometry3, Point3, UnitQuaternion, Vector3};
use tether_core::prelude::Transform;

// =========================================================================
// == Coordinate System Conversion Helpers ==
// =========================================================================
//
// The core and Bevy share a frame convention (right-handed, Y up, cameras look
// down -Z), so these helpers only convert precision and representation.

/// Converts a homogeneous core transform into a Bevy `Transform`.
/// Any scale baked into the matrix is dropped.
pub fn matrix_to_bevy_transform(m: &Transform) -> BevyTransform {
    let rotation = UnitQuaternion::from_matrix(&m.fixed_view::<3, 3>(0, 0).into_owned());
    BevyTransform {
        translation: point_to_bevy(&Point3::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])),
        rotation: quat_to_bevy(&rotation),
        scale: BevyVec3::ONE,
    }
}

/// Builds the Bevy transform of a virtual object from its placement state.
pub fn object_to_bevy_transform(
    position: &Point3<f64>,
    orientation: &UnitQuaternion<f64>,
    scale: f64,
) -> BevyTransform {
    BevyTransform {
        translation: point_to_bevy(position),
        rotation: quat_to_bevy(orientation),
        scale: BevyVec3::splat(scale as f32),
    }
}

pub fn point_to_bevy(p: &Point3<f64>) -> BevyVec3 {
    BevyVec3::new(p.x as f32, p.y as f32, p.z as f32)
}

pub fn quat_to_bevy(q: &UnitQuaternion<f64>) -> BevyQuat {
    BevyQuat::from_xyzw(q.i as f32, q.j as f32, q.k as f32, q.w as f32)
}

/// Camera-to-world pose of a camera at `eye` looking at `target`, with world Y up.
pub fn look_at_pose(eye: &Point3<f64>, target: &Point3<f64>) -> Transform {
    // `look_at_rh` builds the view matrix (world to camera); the pose is its inverse.
    Isometry3::look_at_rh(eye, target, &Vector3::y())
        .inverse()
        .to_homogeneous()
}
