// tether_sim/src/simulation/plugins/raycasting.rs

//! Analytic ray casting against the simulated session's view of the world.
//!
//! There is no physics scene to query: plane anchors are bounded rectangles and
//! feature points are a point cloud, so every hit test is closed-form.

use nalgebra::{Point3, Vector3};
use tether_core::math::position_from_transform;
use tether_core::prelude::*;

const PARALLEL_EPSILON: f64 = 1e-9;

/// A pinhole camera model: vertical field of view and viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinholeIntrinsics {
    pub fov_deg: f64,
    pub viewport: [f64; 2],
}

impl PinholeIntrinsics {
    pub fn screen_center(&self) -> ScreenPoint {
        ScreenPoint::new(self.viewport[0] / 2.0, self.viewport[1] / 2.0)
    }

    /// Direction through `point` in the camera frame (-Z forward, Y up,
    /// screen Y down).
    pub fn camera_ray(&self, point: ScreenPoint) -> Vector3<f64> {
        let [width, height] = self.viewport;
        let tan_half = (self.fov_deg.to_radians() / 2.0).tan();
        let aspect = width / height;
        let ndc_x = 2.0 * point.x / width - 1.0;
        let ndc_y = 1.0 - 2.0 * point.y / height;
        Vector3::new(ndc_x * tan_half * aspect, ndc_y * tan_half, -1.0)
    }
}

/// One frame's ray-cast surface.
#[derive(Debug, Clone)]
pub struct GeometricRayCaster {
    pose: Transform,
    intrinsics: PinholeIntrinsics,
    anchors: Vec<PlaneAnchor>,
    features: Vec<Point3<f64>>,
}

impl GeometricRayCaster {
    pub fn new(
        frame: &CameraFrame,
        intrinsics: PinholeIntrinsics,
        anchors: impl IntoIterator<Item = PlaneAnchor>,
    ) -> Self {
        Self {
            pose: frame.pose,
            intrinsics,
            anchors: anchors.into_iter().collect(),
            features: frame.feature_points.clone().unwrap_or_default(),
        }
    }

    /// World-space ray through a screen point, with a unit direction.
    fn ray(&self, point: ScreenPoint) -> (Point3<f64>, Vector3<f64>) {
        let origin = position_from_transform(&self.pose);
        let local = self.intrinsics.camera_ray(point);
        let direction: Vector3<f64> = self.pose.fixed_view::<3, 3>(0, 0) * local;
        (origin, direction.normalize())
    }
}

impl RayCaster for GeometricRayCaster {
    fn hit_test_planes(&self, point: ScreenPoint) -> Vec<PlaneHit> {
        let (origin, direction) = self.ray(point);
        let mut hits: Vec<(f64, PlaneHit)> = self
            .anchors
            .iter()
            .filter_map(|anchor| {
                let to_local = anchor.transform.try_inverse()?;
                let o = to_local.transform_point(&origin);
                let d = to_local.transform_vector(&direction);
                if d.y.abs() < PARALLEL_EPSILON {
                    return None;
                }
                let t = -o.y / d.y;
                if t <= 0.0 {
                    return None;
                }
                let local = o + d * t;
                let inside = (local.x - anchor.center.x).abs() <= anchor.extent.width / 2.0
                    && (local.z - anchor.center.z).abs() <= anchor.extent.depth / 2.0;
                inside.then(|| {
                    (
                        t,
                        PlaneHit {
                            position: anchor.transform.transform_point(&local),
                            anchor: anchor.id,
                        },
                    )
                })
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, hit)| hit).collect()
    }

    /// Each feature is projected onto the ray; results are sorted by how far the
    /// feature lies from the ray.
    fn hit_test_features(&self, point: ScreenPoint, query: &FeatureHitQuery) -> Vec<FeatureHit> {
        let (origin, direction) = self.ray(point);
        let cos_limit = query
            .cone_half_angle_deg
            .map(|angle| angle.to_radians().cos());

        let mut hits: Vec<(f64, FeatureHit)> = self
            .features
            .iter()
            .filter_map(|feature| {
                let to_feature = feature - origin;
                let along = to_feature.dot(&direction);
                if along <= 0.0 {
                    return None;
                }
                let feature_distance = to_feature.norm();
                if let Some(cos_limit) = cos_limit {
                    if along / feature_distance < cos_limit {
                        return None;
                    }
                }
                if along < query.min_distance || along > query.max_distance {
                    return None;
                }
                let off_ray = (to_feature - direction * along).norm();
                Some((
                    off_ray,
                    FeatureHit {
                        position: origin + direction * along,
                        distance: along,
                    },
                ))
            })
            .collect();
        hits.sort_by(|a, b| a.0.total_cmp(&b.0));
        hits.into_iter().map(|(_, hit)| hit).collect()
    }

    fn hit_test_infinite_plane(
        &self,
        point: ScreenPoint,
        point_on_plane: &Point3<f64>,
    ) -> Option<Point3<f64>> {
        let (origin, direction) = self.ray(point);
        if direction.y.abs() < PARALLEL_EPSILON {
            return None;
        }
        let t = (point_on_plane.y - origin.y) / direction.y;
        (t > 0.0).then(|| origin + direction * t)
    }
}
