//! Fusion state: active map surface, map←odom offset and confidence.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::math::{normalize_angle, shortest_angular_distance};
use crate::core::pose::{Pose2D, Timestamped};
use crate::grid::MapSurface;

/// Fusion gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionParams {
    /// Weight of a new correction in the offset average
    pub update_gain: f64,
    /// Fraction of the remaining headroom gained per accepted scan
    pub confidence_gain: f64,
    /// Confidence ceiling, < 1
    pub max_confidence: f64,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            update_gain: 0.5,
            confidence_gain: 0.01,
            max_confidence: 0.95,
        }
    }
}

/// Mutable localization state guarded by the localizer lock.
#[derive(Debug, Clone)]
pub struct FusionState {
    params: FusionParams,
    map: Option<Arc<MapSurface>>,
    map_sequence: u64,
    offset: Timestamped<Pose2D>,
    confidence: f64,
}

impl FusionState {
    /// Empty state: no map, identity offset, zero confidence.
    pub fn new(params: FusionParams) -> Self {
        Self {
            params,
            map: None,
            map_sequence: 0,
            offset: Timestamped::new(Pose2D::identity(), 0),
            confidence: 0.0,
        }
    }

    /// Active map surface.
    #[inline]
    pub fn map(&self) -> Option<&Arc<MapSurface>> {
        self.map.as_ref()
    }

    /// Current map←odom offset and the time it was last updated.
    #[inline]
    pub fn offset(&self) -> Timestamped<Pose2D> {
        self.offset
    }

    /// Current confidence in [0, max_confidence].
    #[inline]
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Sequence number of the installed map, 0 before any map.
    #[inline]
    pub fn map_sequence(&self) -> u64 {
        self.map_sequence
    }

    /// Install a new map; confidence restarts from zero.
    ///
    /// Maps are ordered by `sequence`. A map older than the installed one is
    /// refused and `false` is returned with the state untouched.
    pub fn set_map(&mut self, map: Arc<MapSurface>, sequence: u64) -> bool {
        if self.map.is_some() && sequence < self.map_sequence {
            return false;
        }
        self.map = Some(map);
        self.map_sequence = sequence;
        self.confidence = 0.0;
        true
    }

    /// Blend a per-scan correction into the offset and raise confidence.
    ///
    /// x and y are averaged exponentially; yaw moves along the shortest arc.
    pub fn fuse(&mut self, correction: &Pose2D, stamp_us: u64) {
        let gain = self.params.update_gain;
        let old = self.offset.data;

        let fused = Pose2D::new(
            old.x * (1.0 - gain) + correction.x * gain,
            old.y * (1.0 - gain) + correction.y * gain,
            normalize_angle(old.yaw + shortest_angular_distance(old.yaw, correction.yaw) * gain),
        );
        self.offset = Timestamped::new(fused, stamp_us);

        let max = self.params.max_confidence;
        self.confidence += (max - self.confidence) * self.params.confidence_gain;
        self.confidence = self.confidence.clamp(0.0, max);
    }

    /// Overwrite the offset without smoothing; confidence restarts from zero.
    pub fn reset(&mut self, offset: Pose2D, stamp_us: u64) {
        self.offset = Timestamped::new(offset, stamp_us);
        self.confidence = 0.0;
    }
}
