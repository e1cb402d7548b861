//! Dead-reckoning odometry with systematic drift.

use rand_distr::Normal;

use super::noise::{zero_mean, SimRng};
use crate::core::pose::Pose2D;

/// Drift model applied to every body-frame motion increment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryDrift {
    /// Relative translation error (0.02 = reads 2% long)
    pub scale: f64,
    /// Yaw error accumulated per metre travelled (rad/m)
    pub yaw_per_metre: f64,
    /// Per-step translation noise (m)
    pub trans_stddev: f64,
    /// Per-step yaw noise (rad)
    pub yaw_stddev: f64,
}

impl Default for OdometryDrift {
    fn default() -> Self {
        Self {
            scale: 0.02,
            yaw_per_metre: 0.02,
            trans_stddev: 0.0,
            yaw_stddev: 0.0,
        }
    }
}

/// Integrates noisy motion increments in the odometry frame.
#[derive(Debug, Clone)]
pub struct DriftingOdometry {
    pose: Pose2D,
    drift: OdometryDrift,
    trans_noise: Option<Normal<f64>>,
    yaw_noise: Option<Normal<f64>>,
    rng: SimRng,
}

impl DriftingOdometry {
    /// Start at the odometry origin.
    pub fn new(drift: OdometryDrift, rng: SimRng) -> Self {
        Self {
            pose: Pose2D::identity(),
            drift,
            trans_noise: zero_mean(drift.trans_stddev),
            yaw_noise: zero_mean(drift.yaw_stddev),
            rng,
        }
    }

    /// Current odometry pose.
    #[inline]
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Apply a true body-frame motion; returns the new odometry pose.
    pub fn advance(&mut self, motion: &Pose2D) -> Pose2D {
        let d = &self.drift;
        let distance = motion.x.hypot(motion.y);
        let trans = self.trans_noise.as_ref();
        let measured = Pose2D::new(
            self.rng.perturb(motion.x * (1.0 + d.scale), trans),
            self.rng.perturb(motion.y * (1.0 + d.scale), trans),
            self.rng.perturb(
                motion.yaw + d.yaw_per_metre * distance,
                self.yaw_noise.as_ref(),
            ),
        );
        self.pose = self.pose.compose(&measured);
        self.pose
    }
}
