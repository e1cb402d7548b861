//! Core foundation layer.
//!
//! No internal dependencies; every other layer builds on these types.
//!
//! - [`math`]: angle normalization and shortest angular distance
//! - [`pose`]: [`Pose2D`] and [`Timestamped`]
//! - [`transform`]: 25-d / 3-d homogeneous transform algebra
//! - [`messages`]: scan, grid, pose-estimate and output transform messages

pub mod math;
pub mod messages;
pub mod pose;
pub mod transform;

pub use messages::{LaserScan, OccupancyGridMsg, PoseEstimate, StampedTransform};
pub use pose::{Pose2D, Timestamped};
