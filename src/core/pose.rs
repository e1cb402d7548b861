//! Planar pose and timestamp wrapper.

use serde::{Deserialize, Serialize};

use super::math::normalize_angle;

/// Planar pose: position in metres and heading in radians.
///
/// Yaw is kept in (-π, π].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    /// X position in metres
    pub x: f64,
    /// Y position in metres
    pub y: f64,
    /// Heading in radians, normalized to (-π, π]
    pub yaw: f64,
}

impl Pose2D {
    /// Create a new pose with yaw normalized.
    #[inline]
    pub fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self {
            x,
            y,
            yaw: normalize_angle(yaw),
        }
    }

    /// Identity pose at origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            yaw: 0.0,
        }
    }

    /// Compose: `self ⊕ other` (apply `other` in this pose's frame).
    #[inline]
    pub fn compose(&self, other: &Pose2D) -> Pose2D {
        let (s, c) = self.yaw.sin_cos();
        Pose2D::new(
            self.x + other.x * c - other.y * s,
            self.y + other.x * s + other.y * c,
            self.yaw + other.yaw,
        )
    }

    /// Pose that undoes this one.
    #[inline]
    pub fn inverse(&self) -> Pose2D {
        let (s, c) = self.yaw.sin_cos();
        Pose2D::new(
            -self.x * c - self.y * s,
            self.x * s - self.y * c,
            -self.yaw,
        )
    }

    /// Map a point from this pose's local frame into the parent frame.
    #[inline]
    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let (s, c) = self.yaw.sin_cos();
        (self.x + x * c - y * s, self.y + x * s + y * c)
    }

    /// Map a point from the parent frame into this pose's local frame.
    #[inline]
    pub fn inverse_transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        let (s, c) = self.yaw.sin_cos();
        let (dx, dy) = (x - self.x, y - self.y);
        (dx * c + dy * s, -dx * s + dy * c)
    }

    /// Euclidean distance between the positions of two poses.
    #[inline]
    pub fn distance(&self, other: &Pose2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}

/// Value tagged with the time it is valid for.
///
/// Timestamps are microseconds, matching the message types.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timestamped<T> {
    /// The wrapped data
    pub data: T,
    /// Timestamp in microseconds
    pub timestamp_us: u64,
}

impl<T> Timestamped<T> {
    /// Create a new timestamped value.
    #[inline]
    pub fn new(data: T, timestamp_us: u64) -> Self {
        Self { data, timestamp_us }
    }
}
