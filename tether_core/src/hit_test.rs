// tether_core/src/hit_test.rs

//! Converts a 2D screen point into a 3D world placement decision.
//!
//! The cascade tries progressively less trustworthy ray casts:
//! 1. known plane anchors, within their measured extent (returns immediately);
//! 2. the feature-point cloud, inside a narrow cone and distance window (cached);
//! 3. an unbounded horizontal plane, if asked for or if step 2 found nothing;
//! 4. the cached high-quality feature hit;
//! 5. an unrestricted feature-point ray cast.

use nalgebra::Point3;
use tracing::debug;

use crate::abstractions::RayCaster;
use crate::config::{
    PlacementSettings, FEATURE_CONE_HALF_ANGLE_DEG, FEATURE_MAX_DISTANCE, FEATURE_MIN_DISTANCE,
};
use crate::types::{AnchorId, ScreenPoint};

// =========================================================================
// == Ray-Cast Results ==
// =========================================================================

/// A hit against an existing plane anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneHit {
    pub position: Point3<f64>,
    pub anchor: AnchorId,
}

/// A hit against the feature-point cloud.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureHit {
    pub position: Point3<f64>,
    /// Distance from the camera to the hit.
    pub distance: f64,
}

/// Restrictions applied to a feature-point ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureHitQuery {
    /// Only accept points within this angle of the ray. `None` accepts any angle.
    pub cone_half_angle_deg: Option<f64>,
    pub min_distance: f64,
    pub max_distance: f64,
}

impl FeatureHitQuery {
    /// The narrow query used to find a trustworthy feature hit.
    pub fn high_quality() -> Self {
        Self {
            cone_half_angle_deg: Some(FEATURE_CONE_HALF_ANGLE_DEG),
            min_distance: FEATURE_MIN_DISTANCE,
            max_distance: FEATURE_MAX_DISTANCE,
        }
    }

    /// No cone, no distance window.
    pub fn unrestricted() -> Self {
        Self {
            cone_half_angle_deg: None,
            min_distance: 0.0,
            max_distance: f64::INFINITY,
        }
    }

    pub fn is_restricted(&self) -> bool {
        self.cone_half_angle_deg.is_some()
            || self.min_distance > 0.0
            || self.max_distance.is_finite()
    }
}

/// Which cascade stage produced a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitSource {
    ExistingPlane,
    InfinitePlane,
    HighQualityFeature,
    Feature,
}

/// The cascade's answer for a screen point.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldHit {
    pub position: Point3<f64>,
    /// Set only when the hit came from a known plane anchor.
    pub anchor: Option<AnchorId>,
    /// True for plane and infinite-plane hits, false for feature-point hits.
    pub hit_confirmed_surface: bool,
    pub source: HitSource,
}

// =========================================================================
// == The Cascade ==
// =========================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct HitTestCascade {
    /// Global switch for dragging across the infinite horizontal plane.
    pub drag_on_infinite_planes: bool,
}

impl HitTestCascade {
    pub fn new(settings: &PlacementSettings) -> Self {
        Self {
            drag_on_infinite_planes: settings.drag_on_infinite_planes,
        }
    }

    pub fn apply_settings(&mut self, settings: &PlacementSettings) {
        self.drag_on_infinite_planes = settings.drag_on_infinite_planes;
    }

    /// Resolves `point` to a world position. `None` means placement failed.
    ///
    /// # Arguments
    /// * `previous_object_position`: pivot for the infinite-plane fallback; the
    ///   world origin is used when absent.
    /// * `allow_infinite_plane`: the caller wants the infinite-plane stage even if
    ///   a good feature hit exists (dragging).
    pub fn resolve_world_position(
        &self,
        ray_caster: &dyn RayCaster,
        point: ScreenPoint,
        previous_object_position: Option<Point3<f64>>,
        allow_infinite_plane: bool,
    ) -> Option<WorldHit> {
        // 1. Existing planes, within their extent. Best possible outcome.
        if let Some(hit) = ray_caster.hit_test_planes(point).into_iter().next() {
            debug!("Hit test resolved on plane anchor {:?}", hit.anchor);
            return Some(WorldHit {
                position: hit.position,
                anchor: Some(hit.anchor),
                hit_confirmed_surface: true,
                source: HitSource::ExistingPlane,
            });
        }

        // 2. High-quality feature points. Remember the result, don't return it yet.
        let high_quality_feature = ray_caster
            .hit_test_features(point, &FeatureHitQuery::high_quality())
            .into_iter()
            .next();

        // 3. The infinite horizontal plane, if desired or if features were no help.
        if (allow_infinite_plane && self.drag_on_infinite_planes) || high_quality_feature.is_none() {
            let pivot = previous_object_position.unwrap_or_else(Point3::origin);
            if let Some(position) = ray_caster.hit_test_infinite_plane(point, &pivot) {
                debug!("Hit test resolved on infinite plane at y = {:.3}", pivot.y);
                return Some(WorldHit {
                    position,
                    anchor: None,
                    hit_confirmed_surface: true,
                    source: HitSource::InfinitePlane,
                });
            }
        }

        // 4. The cached high-quality feature hit.
        if let Some(hit) = high_quality_feature {
            return Some(WorldHit {
                position: hit.position,
                anchor: None,
                hit_confirmed_surface: false,
                source: HitSource::HighQualityFeature,
            });
        }

        // 5. Last resort: any feature point at all.
        let fallback = ray_caster
            .hit_test_features(point, &FeatureHitQuery::unrestricted())
            .into_iter()
            .next();
        if fallback.is_none() {
            debug!("Hit test cascade exhausted without a position");
        }
        fallback.map(|hit| WorldHit {
            position: hit.position,
            anchor: None,
            hit_confirmed_surface: false,
            source: HitSource::Feature,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::mocks::ScriptedRayCaster;

    fn center() -> ScreenPoint {
        ScreenPoint::new(320.0, 240.0)
    }

    fn feature(x: f64, y: f64, z: f64) -> FeatureHit {
        FeatureHit {
            position: Point3::new(x, y, z),
            distance: 1.0,
        }
    }

    fn everything_available() -> ScriptedRayCaster {
        ScriptedRayCaster {
            plane_hits: vec![PlaneHit {
                position: Point3::new(0.0, -1.0, -1.0),
                anchor: AnchorId(7),
            }],
            high_quality_features: vec![feature(0.1, -0.9, -1.1)],
            any_features: vec![feature(0.2, -0.8, -1.2)],
            infinite_plane: Some(Point3::new(0.3, 0.0, -1.3)),
        }
    }

    #[test]
    fn plane_hit_always_wins() {
        let cascade = HitTestCascade {
            drag_on_infinite_planes: true,
        };
        for allow_infinite in [false, true] {
            let hit = cascade
                .resolve_world_position(&everything_available(), center(), None, allow_infinite)
                .unwrap();
            assert_eq!(hit.source, HitSource::ExistingPlane);
            assert_eq!(hit.anchor, Some(AnchorId(7)));
            assert!(hit.hit_confirmed_surface);
            assert_eq!(hit.position, Point3::new(0.0, -1.0, -1.0));
        }
    }

    #[test]
    fn good_features_beat_infinite_plane_unless_dragging() {
        let mut caster = everything_available();
        caster.plane_hits.clear();

        let disabled = HitTestCascade::default();
        let hit = disabled
            .resolve_world_position(&caster, center(), None, true)
            .unwrap();
        assert_eq!(hit.source, HitSource::HighQualityFeature);
        assert!(!hit.hit_confirmed_surface);
        assert_eq!(hit.anchor, None);

        let enabled = HitTestCascade {
            drag_on_infinite_planes: true,
        };
        let hit = enabled
            .resolve_world_position(&caster, center(), None, false)
            .unwrap();
        assert_eq!(hit.source, HitSource::HighQualityFeature);

        let hit = enabled
            .resolve_world_position(&caster, center(), None, true)
            .unwrap();
        assert_eq!(hit.source, HitSource::InfinitePlane);
        assert!(hit.hit_confirmed_surface);
    }

    #[test]
    fn infinite_plane_pivots_on_previous_object_position() {
        let mut caster = everything_available();
        caster.plane_hits.clear();
        caster.high_quality_features.clear();
        let cascade = HitTestCascade::default();

        let hit = cascade
            .resolve_world_position(&caster, center(), Some(Point3::new(5.0, -1.5, 5.0)), false)
            .unwrap();
        assert_eq!(hit.source, HitSource::InfinitePlane);
        assert_eq!(hit.position.y, -1.5);

        let hit = cascade
            .resolve_world_position(&caster, center(), None, false)
            .unwrap();
        assert_eq!(hit.position.y, 0.0);
    }

    #[test]
    fn unrestricted_features_are_the_last_resort() {
        let caster = ScriptedRayCaster {
            any_features: vec![feature(0.2, -0.8, -1.2)],
            ..Default::default()
        };
        let hit = HitTestCascade::default()
            .resolve_world_position(&caster, center(), None, false)
            .unwrap();
        assert_eq!(hit.source, HitSource::Feature);
        assert!(!hit.hit_confirmed_surface);
        assert_eq!(hit.position, Point3::new(0.2, -0.8, -1.2));
    }

    #[test]
    fn exhausted_cascade_yields_no_position() {
        let caster = ScriptedRayCaster::default();
        assert!(HitTestCascade::default()
            .resolve_world_position(&caster, center(), None, true)
            .is_none());
    }

    #[test]
    fn high_quality_query_matches_tuning() {
        let query = FeatureHitQuery::high_quality();
        assert_eq!(query.cone_half_angle_deg, Some(18.0));
        assert_eq!(query.min_distance, 0.2);
        assert_eq!(query.max_distance, 2.0);
        assert!(query.is_restricted());
        assert!(!FeatureHitQuery::unrestricted().is_restricted());
    }
}
