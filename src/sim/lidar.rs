//! Planar lidar simulator with ray casting.
//!
//! Scans are generated from the robot centre, so the sensor frame coincides
//! with the body frame.

use std::f64::consts::{PI, TAU};

use super::noise::{self, SimRng};
use super::world::SimWorld;
use crate::core::messages::LaserScan;
use crate::core::pose::Pose2D;

/// Lidar geometry and noise.
#[derive(Debug, Clone, PartialEq)]
pub struct LidarModel {
    /// Rays per revolution
    pub num_rays: usize,
    /// Minimum valid range (m)
    pub min_range: f64,
    /// Maximum range (m); no hit reads as 0
    pub max_range: f64,
    /// Range noise standard deviation (m)
    pub range_stddev: f64,
    /// Probability that a reading is dropped (reads as 0)
    pub miss_rate: f64,
}

impl Default for LidarModel {
    fn default() -> Self {
        Self {
            num_rays: 360,
            min_range: 0.05,
            max_range: 8.0,
            range_stddev: 0.0,
            miss_rate: 0.0,
        }
    }
}

impl LidarModel {
    /// Angle between rays.
    #[inline]
    pub fn angle_increment(&self) -> f64 {
        TAU / self.num_rays.max(1) as f64
    }

    /// Full revolution starting at -π.
    pub fn scan(
        &self,
        world: &SimWorld,
        pose: &Pose2D,
        stamp_us: u64,
        frame_id: &str,
        rng: &mut SimRng,
    ) -> LaserScan {
        let angle_min = -PI;
        let angle_increment = self.angle_increment();
        let range_noise = noise::zero_mean(self.range_stddev);
        let dropout = noise::dropout(self.miss_rate);

        let ranges = (0..self.num_rays)
            .map(|i| {
                let angle = angle_min + i as f64 * angle_increment;
                if rng.dropped(dropout.as_ref()) {
                    return 0.0;
                }
                match world.ray_cast(pose.x, pose.y, pose.yaw + angle, self.max_range) {
                    Some(r) => rng.perturb(r, range_noise.as_ref()).max(self.min_range) as f32,
                    None => 0.0,
                }
            })
            .collect();

        LaserScan {
            stamp_us,
            frame_id: frame_id.to_string(),
            angle_min,
            angle_increment,
            ranges,
        }
    }
}
