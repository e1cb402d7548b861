//! # Sthiti
//!
//! Real-time 2D localization against a known occupancy grid map.
//!
//! ## Overview
//!
//! Given a static map and a stream of planar range scans plus odometry,
//! Sthiti keeps a corrected map←odom offset and publishes it as a map→odom
//! transform at sensor rate.
//!
//! - **Grid preprocessing**: occupancy in [0, 1], multi-resolution
//!   downscaling and box smoothing into a differentiable surface
//! - **Pose solver**: damped Gauss-Newton on `1 - occupancy` residuals
//! - **Hypothesis search**: best-of-N refinement from Gaussian restarts
//!   around the odometry prior, narrowing as confidence grows
//! - **Fusion**: exponential smoothing of per-scan corrections with a
//!   confidence that saturates below 1
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sthiti::config::LocalizerConfig;
//! use sthiti::localizer::{Localizer, RecordingSink, TransformBuffer};
//!
//! let buffer = Arc::new(TransformBuffer::new(100_000, 512));
//! let sink = Arc::new(RecordingSink::new());
//! let localizer = Localizer::new(LocalizerConfig::default(), buffer.clone(), sink)?;
//!
//! localizer.on_map(&map_msg)?;
//! localizer.on_pose_estimate(&initial_pose)?;
//! let update = localizer.on_scan(&scan)?;
//! println!("offset {:?} confidence {:.2}", update.offset.data, update.confidence);
//! ```
//!
//! ## Coordinate System
//!
//! ROS REP-103 convention: x forward, y left, yaw counter-clockwise from +x.
//! Map cells are addressed with integer coordinates at cell centres.

#![warn(missing_docs)]

// Foundation types and transform algebra
pub mod core;

// Error taxonomy
#[allow(missing_docs)]
pub mod error;

// Occupancy grid preprocessing and sampling
pub mod grid;

// Pose solver and hypothesis search
pub mod matching;

// Fusion state and update handlers
pub mod localizer;

// TOML configuration
#[allow(missing_docs)]
pub mod config;

// Event loop thread
pub mod threads;

// Synthetic world for demos and tests
pub mod sim;

pub use crate::core::{LaserScan, OccupancyGridMsg, Pose2D, PoseEstimate, StampedTransform};
pub use config::LocalizerConfig;
pub use error::{ConfigError, LocalizeError, LookupError, MapError};
pub use localizer::{Localizer, LocalizerStatus, ScanUpdate, TransformBuffer};
