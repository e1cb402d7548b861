//! Synthetic world for demos, tests and benchmarks.
//!
//! - [`SimWorld`]: square occupancy world with rooms, boxes and ray casting
//! - [`LidarModel`]: 360° range scans with optional noise and dropouts
//! - [`DriftingOdometry`]: dead reckoning with scale and heading drift
//! - [`SimDrive`]: ticks of ground truth, odometry and scans

mod drive;
mod lidar;
mod noise;
mod odometry;
mod world;

pub use drive::{SimDrive, SimFrame};
pub use lidar::LidarModel;
pub use noise::SimRng;
pub use odometry::{DriftingOdometry, OdometryDrift};
pub use world::SimWorld;
