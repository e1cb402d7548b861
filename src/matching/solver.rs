//! Damped Gauss-Newton pose solver.
//!
//! Moves a planar pose so that transformed scan points land on occupied
//! cells of a [`MapSurface`]. Each point contributes the residual
//! `r = 1 - value` and the Jacobian of the sampled value:
//!
//! ```text
//! ∂v/∂x   = gx
//! ∂v/∂y   = gy
//! ∂v/∂yaw = gx·(-s·px - c·py) + gy·(c·px - s·py)
//! ```
//!
//! The update is `Δ = (JᵀJ + damping·I)⁻¹ Jᵀr`, applied scaled by `gain`.
//! A step that would raise the residual norm is recomputed with ten times the
//! damping, so the residual never increases from one step to the next.

use log::trace;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

use super::types::ScanPoint;
use crate::core::pose::Pose2D;
use crate::grid::MapSurface;

/// Damping increases tried before a step is given up.
const MAX_STEP_ATTEMPTS: usize = 8;
const DAMPING_GROWTH: f64 = 10.0;

/// Solver step parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Fraction of each Gauss-Newton step applied.
    pub gain: f64,
    /// Levenberg-Marquardt damping added to the diagonal.
    pub damping: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gain: 0.1,
            damping: 1000.0,
        }
    }
}

/// Iterative pose solver with a working pose and its residual norm.
#[derive(Debug, Clone)]
pub struct PoseSolver {
    config: SolverConfig,
    pose: Pose2D,
    r_norm: f64,
}

impl PoseSolver {
    /// Create a solver starting at `pose`.
    pub fn new(config: SolverConfig, pose: Pose2D) -> Self {
        Self {
            config,
            pose,
            r_norm: 0.0,
        }
    }

    /// Current working pose.
    #[inline]
    pub fn pose(&self) -> Pose2D {
        self.pose
    }

    /// Residual norm at the working pose after the last [`solve`](Self::solve).
    #[inline]
    pub fn r_norm(&self) -> f64 {
        self.r_norm
    }

    /// Run up to `steps` damped Gauss-Newton steps and return the residual
    /// norm at the resulting pose.
    ///
    /// With no points the pose is untouched and the residual norm is 0.
    /// The solve stops early when the damped system cannot be solved or no
    /// damping level yields a step that keeps the residual from rising.
    pub fn solve(&mut self, surface: &MapSurface, points: &[ScanPoint], steps: usize) -> f64 {
        if points.is_empty() {
            self.r_norm = 0.0;
            return self.r_norm;
        }

        let mut current = residual_norm(surface, points, &self.pose);
        for _ in 0..steps {
            match self.step(surface, points, current) {
                Some(r) => current = r,
                None => break,
            }
        }

        self.r_norm = current;
        self.r_norm
    }

    /// One accepted step, or `None` if the pose was left in place.
    fn step(&mut self, surface: &MapSurface, points: &[ScanPoint], current: f64) -> Option<f64> {
        let (s, c) = self.pose.yaw.sin_cos();
        let mut h = Matrix3::<f64>::zeros();
        let mut b = Vector3::<f64>::zeros();

        for p in points {
            let wx = self.pose.x + c * p.x - s * p.y;
            let wy = self.pose.y + s * p.x + c * p.y;
            let sample = surface.sample_metric(wx, wy);
            let r = 1.0 - sample.value;

            let j = Vector3::new(
                sample.grad_x,
                sample.grad_y,
                sample.grad_x * (-s * p.x - c * p.y) + sample.grad_y * (c * p.x - s * p.y),
            );

            h += (j * j.transpose()) * p.w;
            b += j * (r * p.w);
        }

        let gain = self.config.gain;
        let mut damping = self.config.damping;
        for attempt in 0..MAX_STEP_ATTEMPTS {
            let mut damped = h;
            for i in 0..3 {
                damped[(i, i)] += damping;
            }

            let delta = damped.try_inverse()? * b;
            if delta.iter().any(|d| !d.is_finite()) {
                return None;
            }

            let candidate = Pose2D::new(
                self.pose.x + gain * delta[0],
                self.pose.y + gain * delta[1],
                self.pose.yaw + gain * delta[2],
            );
            let r = residual_norm(surface, points, &candidate);
            if r <= current {
                self.pose = candidate;
                return Some(r);
            }

            trace!(
                "[Solver] Step {} raised residual {:.6} -> {:.6}, damping {}",
                attempt,
                current,
                r,
                damping
            );
            damping = if damping > 0.0 {
                damping * DAMPING_GROWTH
            } else {
                1.0
            };
        }
        None
    }
}

/// `sqrt(Σ w·r² / Σ w)` of the points placed at `pose`.
pub fn residual_norm(surface: &MapSurface, points: &[ScanPoint], pose: &Pose2D) -> f64 {
    let (s, c) = pose.yaw.sin_cos();
    let mut sum_r2 = 0.0;
    let mut sum_w = 0.0;

    for p in points {
        let wx = pose.x + c * p.x - s * p.y;
        let wy = pose.y + s * p.x + c * p.y;
        let r = 1.0 - surface.sample_metric(wx, wy).value;
        sum_r2 += p.w * r * r;
        sum_w += p.w;
    }

    if sum_w > 0.0 {
        (sum_r2 / sum_w).sqrt()
    } else {
        0.0
    }
}
