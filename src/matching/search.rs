//! Stochastic multi-hypothesis search around a prior pose.
//!
//! The prior is refined first; then `sample_rate` starts are drawn from a
//! Gaussian centred on the prior and refined the same way. The spread
//! shrinks as confidence grows: `std_axis · max(1 - confidence, 0)`.
//! A trial replaces the best only with a strictly lower residual norm, so
//! the result is never worse than the refined prior.

use log::debug;
use rand::prelude::*;
use rand::rngs::SmallRng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

use super::solver::{PoseSolver, SolverConfig};
use super::types::{Hypothesis, ScanPoint, SearchOutcome};
use crate::core::pose::Pose2D;
use crate::grid::MapSurface;

/// Search parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Gauss-Newton steps per hypothesis
    pub iterations: usize,
    /// Perturbed hypotheses per search
    pub sample_rate: usize,
    /// Spread along x in metres
    pub std_x: f64,
    /// Spread along y in metres
    pub std_y: f64,
    /// Spread in yaw in radians
    pub std_yaw: f64,
    /// RNG seed (0 = entropy)
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            iterations: 20,
            sample_rate: 10,
            std_x: 0.5,
            std_y: 0.5,
            std_yaw: 0.5,
            seed: 0,
        }
    }
}

/// Multi-start pose search with an owned random generator.
#[derive(Debug, Clone)]
pub struct HypothesisSearch {
    solver: SolverConfig,
    config: SearchConfig,
    rng: SmallRng,
}

impl HypothesisSearch {
    /// Create a search seeded from `config.seed`.
    pub fn new(solver: SolverConfig, config: SearchConfig) -> Self {
        let rng = if config.seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(config.seed)
        };
        Self::with_rng(solver, config, rng)
    }

    /// Create a search with an explicit generator.
    pub fn with_rng(solver: SolverConfig, config: SearchConfig, rng: SmallRng) -> Self {
        Self {
            solver,
            config,
            rng,
        }
    }

    /// Search parameters.
    #[inline]
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Refine the prior alone.
    pub fn refine(&self, surface: &MapSurface, points: &[ScanPoint], start: Pose2D) -> Hypothesis {
        let mut solver = PoseSolver::new(self.solver, start);
        let r_norm = solver.solve(surface, points, self.config.iterations);
        Hypothesis {
            pose: solver.pose(),
            r_norm,
        }
    }

    /// Refine the prior plus `sample_rate` perturbed starts; keep the best.
    pub fn run(
        &mut self,
        surface: &MapSurface,
        points: &[ScanPoint],
        prior: Pose2D,
        confidence: f64,
    ) -> SearchOutcome {
        let scale = (1.0 - confidence).max(0.0);
        let std_x = self.config.std_x * scale;
        let std_y = self.config.std_y * scale;
        let std_yaw = self.config.std_yaw * scale;

        let mut best = self.refine(surface, points, prior);
        let mut winner = 0;

        for trial in 1..=self.config.sample_rate {
            let start = Pose2D::new(
                prior.x + self.gaussian(std_x),
                prior.y + self.gaussian(std_y),
                prior.yaw + self.gaussian(std_yaw),
            );
            let candidate = self.refine(surface, points, start);
            if candidate.r_norm < best.r_norm {
                best = candidate;
                winner = trial;
            }
        }

        debug!(
            "[Search] best r_norm={:.4} from trial {}/{} (std {:.3}, {:.3}, {:.3})",
            best.r_norm, winner, self.config.sample_rate, std_x, std_y, std_yaw
        );

        SearchOutcome {
            best,
            winner,
            trials: self.config.sample_rate,
        }
    }

    #[inline]
    fn gaussian(&mut self, stddev: f64) -> f64 {
        if stddev == 0.0 {
            return 0.0;
        }
        let n: f64 = self.rng.sample(StandardNormal);
        n * stddev
    }
}
