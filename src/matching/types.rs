//! Types shared by the solver and the hypothesis search.

use crate::core::pose::Pose2D;

/// Scan point in the body frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanPoint {
    /// X in metres
    pub x: f64,
    /// Y in metres
    pub y: f64,
    /// Weight in the normal equations (currently always 1.0)
    pub w: f64,
}

impl ScanPoint {
    /// Unit-weight point.
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, w: 1.0 }
    }

    /// Unit-weight point from a range reading.
    #[inline]
    pub fn from_polar(range: f64, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(range * c, range * s)
    }
}

/// Candidate pose with its residual norm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hypothesis {
    /// Pose in grid-frame metres
    pub pose: Pose2D,
    /// Root-mean-square residual at `pose`
    pub r_norm: f64,
}

/// Result of a hypothesis search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchOutcome {
    /// Lowest-residual hypothesis
    pub best: Hypothesis,
    /// Trial that produced `best` (0 = the prior itself)
    pub winner: usize,
    /// Number of perturbed trials evaluated
    pub trials: usize,
}
