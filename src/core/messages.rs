//! Messages exchanged with the transport layer.
//!
//! These are immutable snapshots handed to the localizer at call time.

use nalgebra::{Isometry3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use super::pose::Pose2D;
use super::transform::isometry_from_pose;

/// Planar range scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Acquisition time in microseconds
    pub stamp_us: u64,
    /// Sensor frame the ranges are expressed in
    pub frame_id: String,
    /// Angle of the first reading in radians
    pub angle_min: f64,
    /// Angle between consecutive readings in radians
    pub angle_increment: f64,
    /// Range readings in metres (≤ 0 or non-finite = no return)
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Angle of reading `i`.
    #[inline]
    pub fn angle(&self, i: usize) -> f64 {
        self.angle_min + i as f64 * self.angle_increment
    }
}

/// Occupancy grid message.
///
/// `data` is row-major with cells in percent (0..=100) and -1 for unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OccupancyGridMsg {
    /// Cells along x
    pub width: usize,
    /// Cells along y
    pub height: usize,
    /// Cell size in metres
    pub resolution: f64,
    /// Pose of cell (0, 0)'s corner in the map frame
    pub origin: Isometry3<f64>,
    /// Cell values
    pub data: Vec<i8>,
}

/// Externally supplied pose estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// Time of the estimate in microseconds
    pub stamp_us: u64,
    /// Frame the pose is expressed in (must be the map frame)
    pub frame_id: String,
    /// Body pose
    pub pose: Isometry3<f64>,
}

impl PoseEstimate {
    /// Estimate from a planar pose.
    pub fn planar(stamp_us: u64, frame_id: impl Into<String>, pose: &Pose2D) -> Self {
        Self {
            stamp_us,
            frame_id: frame_id.into(),
            pose: isometry_from_pose(pose),
        }
    }
}

/// Transform published to the broadcast sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampedTransform {
    /// Validity time in microseconds
    pub stamp_us: u64,
    /// Parent frame (map)
    pub parent_frame: String,
    /// Child frame (odometry)
    pub child_frame: String,
    /// Translation; z is always 0
    pub translation: Vector3<f64>,
    /// Yaw-only rotation
    pub rotation: UnitQuaternion<f64>,
}

impl StampedTransform {
    /// Planar offset as a stamped transform.
    pub fn planar(
        stamp_us: u64,
        parent_frame: impl Into<String>,
        child_frame: impl Into<String>,
        offset: &Pose2D,
    ) -> Self {
        Self {
            stamp_us,
            parent_frame: parent_frame.into(),
            child_frame: child_frame.into(),
            translation: Vector3::new(offset.x, offset.y, 0.0),
            rotation: UnitQuaternion::from_euler_angles(0.0, 0.0, offset.yaw),
        }
    }

    /// Planar pose carried by this transform.
    pub fn to_pose(&self) -> Pose2D {
        Pose2D::new(
            self.translation.x,
            self.translation.y,
            self.rotation.euler_angles().2,
        )
    }
}
