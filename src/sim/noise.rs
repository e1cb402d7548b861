//! Random sources for the simulated sensors.
//!
//! A drive owns one seeded [`SimRng`] and hands each sensor its own
//! [`fork`](SimRng::fork), so turning on lidar noise leaves the odometry
//! trace unchanged. Noise shapes are plain `rand_distr` distributions built
//! once from the sensor model; `None` means the sensor is noiseless.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Bernoulli, Distribution, Normal};

/// Seeded random stream for one simulated sensor.
#[derive(Debug, Clone)]
pub struct SimRng {
    rng: SmallRng,
}

impl SimRng {
    /// Seed 0 draws from entropy; any other seed is reproducible.
    pub fn seeded(seed: u64) -> Self {
        let rng = if seed == 0 {
            SmallRng::from_entropy()
        } else {
            SmallRng::seed_from_u64(seed)
        };
        Self { rng }
    }

    /// Independent stream seeded from this one.
    pub fn fork(&mut self) -> SimRng {
        SimRng {
            rng: SmallRng::seed_from_u64(self.rng.gen()),
        }
    }

    /// `value` plus one draw of `noise`.
    #[inline]
    pub fn perturb(&mut self, value: f64, noise: Option<&Normal<f64>>) -> f64 {
        match noise {
            Some(n) => value + n.sample(&mut self.rng),
            None => value,
        }
    }

    /// Whether this reading is lost.
    #[inline]
    pub fn dropped(&mut self, dropout: Option<&Bernoulli>) -> bool {
        dropout.is_some_and(|d| d.sample(&mut self.rng))
    }
}

/// Zero-mean Gaussian, `None` unless `stddev` is positive and finite.
pub fn zero_mean(stddev: f64) -> Option<Normal<f64>> {
    if stddev > 0.0 {
        Normal::new(0.0, stddev).ok()
    } else {
        None
    }
}

/// Dropout with the given rate (clamped to 1), `None` for a rate ≤ 0.
pub fn dropout(rate: f64) -> Option<Bernoulli> {
    if rate > 0.0 {
        Bernoulli::new(rate.min(1.0)).ok()
    } else {
        None
    }
}
