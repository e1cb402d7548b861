//! Angular arithmetic for planar poses.

use std::f64::consts::{PI, TAU};

/// Normalize angle to (-π, π].
///
/// # Example
/// ```
/// use sthiti::core::math::normalize_angle;
/// use std::f64::consts::PI;
///
/// assert!((normalize_angle(3.0 * PI) - PI).abs() < 1e-9);
/// assert!((normalize_angle(-PI) - PI).abs() < 1e-9);
/// ```
#[inline]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a > PI {
        a -= TAU;
    } else if a <= -PI {
        a += TAU;
    }
    a
}

/// Shortest signed rotation that takes `from` onto `to`.
///
/// ```
/// use sthiti::core::math::shortest_angular_distance;
/// use std::f64::consts::PI;
///
/// // Crossing the ±π boundary takes the short way
/// let d = shortest_angular_distance(PI - 0.1, -PI + 0.1);
/// assert!((d - 0.2).abs() < 1e-9);
/// ```
#[inline]
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    normalize_angle(to - from)
}
