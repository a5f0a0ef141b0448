// tether_core/src/math.rs

//! Small vector and transform helpers shared by the placement components.

use nalgebra::{Point3, Vector3};

use crate::types::Transform;

/// Extracts the translation of a homogeneous transform as a world position.
pub fn position_from_transform(transform: &Transform) -> Point3<f64> {
    Point3::new(transform[(0, 3)], transform[(1, 3)], transform[(2, 3)])
}

/// Builds a pure translation transform.
pub fn transform_from_position(position: &Point3<f64>) -> Transform {
    Transform::new_translation(&position.coords)
}

/// Returns `v` shortened to `max_length` if it is longer, otherwise `v` unchanged.
/// The direction is preserved exactly.
pub fn clamp_length(v: &Vector3<f64>, max_length: f64) -> Vector3<f64> {
    let length = v.norm();
    if length > max_length {
        v * (max_length / length)
    } else {
        *v
    }
}

/// Returns `v` rescaled to `length`. A zero vector stays zero.
pub fn with_length(v: &Vector3<f64>, length: f64) -> Vector3<f64> {
    let current = v.norm();
    if current == 0.0 {
        return *v;
    }
    v * (length / current)
}

/// Distance between two world positions.
pub fn distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (b - a).norm()
}

/// Converts a world position into the local frame described by `local_to_world`.
/// Returns `None` for a singular transform.
pub fn world_to_local(local_to_world: &Transform, world: &Point3<f64>) -> Option<Point3<f64>> {
    let world_to_local = local_to_world.try_inverse()?;
    Some(world_to_local.transform_point(world))
}

/// Ease-in/ease-out interpolation weight for `t` in [0, 1].
pub fn ease_in_out(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Yaw (rotation about +Y) in whole degrees, wrapped into [0, 360).
pub fn yaw_degrees(orientation: &nalgebra::UnitQuaternion<f64>) -> i64 {
    let (_, yaw, _) = euler_yxz(orientation);
    let degrees = (yaw.to_degrees().round() as i64) % 360;
    if degrees < 0 {
        degrees + 360
    } else {
        degrees
    }
}

// Y-up scene graphs report yaw as the Y component of a Y-X-Z decomposition.
fn euler_yxz(q: &nalgebra::UnitQuaternion<f64>) -> (f64, f64, f64) {
    let m = q.to_rotation_matrix();
    let m = m.matrix();
    let pitch = (-m[(1, 2)]).clamp(-1.0, 1.0).asin();
    let yaw = m[(0, 2)].atan2(m[(2, 2)]);
    let roll = m[(1, 0)].atan2(m[(1, 1)]);
    (pitch, yaw, roll)
}
