//! Simulated drive producing ground truth, odometry and scans per tick.

use super::lidar::LidarModel;
use super::noise::SimRng;
use super::odometry::{DriftingOdometry, OdometryDrift};
use super::world::SimWorld;
use crate::core::messages::LaserScan;
use crate::core::pose::Pose2D;

/// One simulation tick.
#[derive(Debug, Clone)]
pub struct SimFrame {
    /// Tick time in microseconds
    pub stamp_us: u64,
    /// True body pose in the map frame
    pub truth: Pose2D,
    /// Body pose reported by odometry
    pub odom: Pose2D,
    /// Scan taken at `truth`
    pub scan: LaserScan,
}

impl SimFrame {
    /// True map←odom offset at this tick.
    pub fn true_offset(&self) -> Pose2D {
        self.truth.compose(&self.odom.inverse())
    }
}

/// Drive with a constant body-frame motion per tick (straight line or arc).
#[derive(Debug, Clone)]
pub struct SimDrive {
    world: SimWorld,
    lidar: LidarModel,
    odometry: DriftingOdometry,
    lidar_rng: SimRng,
    frame_id: String,
    truth: Pose2D,
    motion: Pose2D,
    period_us: u64,
    stamp_us: u64,
}

impl SimDrive {
    /// Start at `start` (map frame); odometry starts at its own origin.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        world: SimWorld,
        lidar: LidarModel,
        drift: OdometryDrift,
        start: Pose2D,
        motion: Pose2D,
        period_us: u64,
        frame_id: &str,
        seed: u64,
    ) -> Self {
        let mut rng = SimRng::seeded(seed);
        let odom_rng = rng.fork();
        Self {
            world,
            lidar,
            odometry: DriftingOdometry::new(drift, odom_rng),
            lidar_rng: rng.fork(),
            frame_id: frame_id.to_string(),
            truth: start,
            motion,
            period_us,
            stamp_us: 0,
        }
    }

    /// World being driven in.
    #[inline]
    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    /// Current tick without advancing.
    pub fn current(&mut self) -> SimFrame {
        let scan = self.lidar.scan(
            &self.world,
            &self.truth,
            self.stamp_us,
            &self.frame_id,
            &mut self.lidar_rng,
        );
        SimFrame {
            stamp_us: self.stamp_us,
            truth: self.truth,
            odom: self.odometry.pose(),
            scan,
        }
    }

    /// Advance one period and return the new tick.
    pub fn step(&mut self) -> SimFrame {
        self.truth = self.truth.compose(&self.motion);
        self.odometry.advance(&self.motion);
        self.stamp_us += self.period_us;
        self.current()
    }
}

impl Iterator for SimDrive {
    type Item = SimFrame;

    fn next(&mut self) -> Option<SimFrame> {
        Some(self.step())
    }
}
