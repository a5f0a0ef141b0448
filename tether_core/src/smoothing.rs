// tether_core/src/smoothing.rs

//! Stabilizes the perceived distance of the placed object under camera jitter.
//!
//! Only the *length* of the camera-to-target vector is averaged. The direction
//! always follows the latest ray cast, so the object never lags behind the
//! crosshair; it just stops pumping in and out.

use std::collections::VecDeque;

use nalgebra::Point3;

use crate::config::{DISTANCE_HISTORY_CAPACITY, MAX_PLACEMENT_DISTANCE};
use crate::math::{clamp_length, with_length};

/// Bounded, oldest-first history of recent object-to-camera distances.
#[derive(Debug, Clone)]
pub struct RecentDistanceHistory {
    distances: VecDeque<f64>,
    capacity: usize,
}

impl Default for RecentDistanceHistory {
    fn default() -> Self {
        Self::with_capacity(DISTANCE_HISTORY_CAPACITY)
    }
}

impl RecentDistanceHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            distances: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a sample, evicting the oldest one on overflow.
    pub fn push(&mut self, distance: f64) {
        if self.distances.len() == self.capacity {
            self.distances.pop_front();
        }
        self.distances.push_back(distance);
    }

    /// Arithmetic mean of the current samples, `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.distances.is_empty() {
            return None;
        }
        Some(self.distances.iter().sum::<f64>() / self.distances.len() as f64)
    }

    pub fn clear(&mut self) {
        self.distances.clear();
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.distances.iter()
    }
}

/// Computes committed object positions from raw ray-cast targets.
#[derive(Debug, Clone, Default)]
pub struct PlacementSmoother {
    history: RecentDistanceHistory,
}

impl PlacementSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &RecentDistanceHistory {
        &self.history
    }

    /// Immediate placement: clamps the target to the maximum distance and
    /// clears the history. Used when the object is freshly (re)placed.
    pub fn place(&mut self, camera: &Point3<f64>, target: &Point3<f64>) -> Point3<f64> {
        self.history.clear();
        let camera_to_target = clamp_length(&(target - camera), MAX_PLACEMENT_DISTANCE);
        camera + camera_to_target
    }

    /// Incremental move. The clamped distance is recorded; if `filtered`, the
    /// committed distance is the mean of the history instead of the raw one.
    pub fn update(&mut self, camera: &Point3<f64>, target: &Point3<f64>, filtered: bool) -> Point3<f64> {
        let camera_to_target = clamp_length(&(target - camera), MAX_PLACEMENT_DISTANCE);
        self.history.push(camera_to_target.norm());

        if !filtered {
            return camera + camera_to_target;
        }

        // The sample above guarantees the history is non-empty.
        match self.history.average() {
            Some(average) => camera + with_length(&camera_to_target, average),
            None => camera + camera_to_target,
        }
    }
}
