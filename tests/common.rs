//! Test utilities for Sthiti integration tests.
//!
//! Builds a localizer wired to an in-memory transform buffer and a
//! recording sink, plus a simulated drive through a small room.

#![allow(dead_code)]

use std::sync::Arc;

use nalgebra::Isometry3;
use sthiti::config::LocalizerConfig;
use sthiti::core::math::shortest_angular_distance;
use sthiti::core::transform::isometry_from_pose;
use sthiti::localizer::{Localizer, RecordingSink, TransformBuffer};
use sthiti::sim::{LidarModel, OdometryDrift, SimDrive, SimFrame, SimWorld};
use sthiti::{Pose2D, PoseEstimate};

pub const LASER_FRAME: &str = "laser";

/// 4m x 4m room at 5cm with a box in one corner.
pub fn room() -> SimWorld {
    let mut world = SimWorld::room(80, 0.05, 3);
    world.add_box((0.6, 2.6), (1.0, 3.2));
    world
}

/// Default configuration with a fixed seed.
pub fn seeded_config(seed: u64) -> LocalizerConfig {
    let mut config = LocalizerConfig::default();
    config.search.seed = seed;
    config
}

pub struct Harness {
    pub localizer: Arc<Localizer>,
    pub buffer: Arc<TransformBuffer>,
    pub sink: Arc<RecordingSink>,
}

impl Harness {
    pub fn new(config: LocalizerConfig) -> Self {
        let buffer = Arc::new(TransformBuffer::new(
            config.transforms.tolerance_ms * 1000,
            config.transforms.history_len,
        ));
        buffer.set_static(&config.frames.base_frame, LASER_FRAME, Isometry3::identity());
        let sink = Arc::new(RecordingSink::new());
        let localizer = Arc::new(Localizer::new(config, buffer.clone(), sink.clone()).unwrap());
        Self {
            localizer,
            buffer,
            sink,
        }
    }

    /// Publish the odometry pose of a tick.
    pub fn publish_odom(&self, frame: &SimFrame) {
        let frames = &self.localizer.config().frames;
        self.buffer.set_transform(
            &frames.odom_frame,
            &frames.base_frame,
            frame.stamp_us,
            isometry_from_pose(&frame.odom),
        );
    }

    /// Inject `pose` as the body's map pose at the tick's stamp.
    pub fn set_pose(&self, frame: &SimFrame, pose: &Pose2D) {
        let map_frame = self.localizer.config().frames.map_frame.clone();
        self.localizer
            .on_pose_estimate(&PoseEstimate::planar(frame.stamp_us, map_frame, pose))
            .unwrap();
    }
}

/// Arc through the middle of [`room`], 10Hz ticks.
pub fn arc_drive(world: SimWorld, seed: u64) -> SimDrive {
    SimDrive::new(
        world,
        LidarModel {
            range_stddev: 0.01,
            miss_rate: 0.02,
            ..LidarModel::default()
        },
        OdometryDrift {
            trans_stddev: 0.001,
            yaw_stddev: 0.001,
            ..OdometryDrift::default()
        },
        Pose2D::new(2.0, 1.2, 0.0),
        Pose2D::new(0.02, 0.0, 0.025),
        100_000,
        LASER_FRAME,
        seed,
    )
}

/// Translational and absolute rotational error between two offsets.
pub fn offset_error(estimate: &Pose2D, truth: &Pose2D) -> (f64, f64) {
    (
        estimate.distance(truth),
        shortest_angular_distance(truth.yaw, estimate.yaw).abs(),
    )
}
