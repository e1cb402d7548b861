//! Homogeneous transform algebra for planar localization.
//!
//! Two flavours of 4×4 matrices are used:
//!
//! - **25-d** transforms describe planar motion (x, y, yaw). The rotation block
//!   holds the yaw rotation and the z-translation slot carries the yaw angle
//!   itself, so a product of 25-d transforms accumulates yaw in z and
//!   [`origin_of`] reads (x, y, yaw) straight out of the projected origin.
//! - **3-d** transforms are ordinary rigid transforms, used for the sensor
//!   mounting where roll/pitch may matter when projecting scan points.
//!
//! ```text
//! translate25(x, y)     rotate25_z(θ)
//! ┌ 1 0 0 x ┐           ┌ c -s 0 0 ┐
//! │ 0 1 0 y │           │ s  c 0 0 │
//! │ 0 0 1 0 │           │ 0  0 1 θ │
//! └ 0 0 0 1 ┘           └ 0  0 0 1 ┘
//! ```

use nalgebra::{Isometry3, Matrix4, Translation3, UnitQuaternion, Vector3, Vector4};

use super::pose::Pose2D;

/// Homogeneous 4×4 transform.
pub type Transform = Matrix4<f64>;

/// Homogeneous origin `(0, 0, 0, 1)`.
#[inline]
pub fn origin() -> Vector4<f64> {
    Vector4::new(0.0, 0.0, 0.0, 1.0)
}

/// Planar translation.
pub fn translate25(x: f64, y: f64) -> Transform {
    Matrix4::new(
        1.0, 0.0, 0.0, x, //
        0.0, 1.0, 0.0, y, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Planar rotation that also accumulates `yaw` in the z slot.
pub fn rotate25_z(yaw: f64) -> Transform {
    let (s, c) = yaw.sin_cos();
    Matrix4::new(
        c, -s, 0.0, 0.0, //
        s, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, yaw, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Pure rotation about z for 3-d points.
pub fn rotate3_z(yaw: f64) -> Transform {
    let (s, c) = yaw.sin_cos();
    Matrix4::new(
        c, -s, 0.0, 0.0, //
        s, c, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// 25-d transform of a planar pose: `translate25(x, y) · rotate25_z(yaw)`.
#[inline]
pub fn pose25(pose: &Pose2D) -> Transform {
    translate25(pose.x, pose.y) * rotate25_z(pose.yaw)
}

/// Planar (x, y, yaw) part of a rigid transform as a 25-d transform.
pub fn from_isometry_25(iso: &Isometry3<f64>) -> Transform {
    let t = iso.translation.vector;
    translate25(t.x, t.y) * rotate25_z(yaw_of(&iso.rotation))
}

/// Full rigid transform as a 3-d homogeneous matrix.
#[inline]
pub fn from_isometry_3(iso: &Isometry3<f64>) -> Transform {
    iso.to_homogeneous()
}

/// Closed-form inverse of a 25-d transform.
///
/// Exact for matrices built by this module.
pub fn inverse25(m: &Transform) -> Transform {
    let (c, s) = (m[(0, 0)], m[(1, 0)]);
    let (x, y, yaw) = (m[(0, 3)], m[(1, 3)], m[(2, 3)]);
    Matrix4::new(
        c, s, 0.0, -(c * x + s * y), //
        -s, c, 0.0, s * x - c * y, //
        0.0, 0.0, 1.0, -yaw, //
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Homogeneous divide.
#[inline]
pub fn project(v: &Vector4<f64>) -> Vector3<f64> {
    Vector3::new(v.x / v.w, v.y / v.w, v.z / v.w)
}

/// Planar pose of the origin under a 25-d transform.
pub fn origin_of(m: &Transform) -> Pose2D {
    let p = project(&(m * origin()));
    Pose2D::new(p.x, p.y, p.z)
}

/// Yaw of a rotation (ZYX convention).
#[inline]
pub fn yaw_of(rotation: &UnitQuaternion<f64>) -> f64 {
    rotation.euler_angles().2
}

/// Rigid transform of a planar pose with z = 0 and yaw-only rotation.
pub fn isometry_from_pose(pose: &Pose2D) -> Isometry3<f64> {
    Isometry3::from_parts(
        Translation3::new(pose.x, pose.y, 0.0),
        UnitQuaternion::from_euler_angles(0.0, 0.0, pose.yaw),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_pose_eq(a: Pose2D, b: Pose2D) {
        assert_relative_eq!(a.x, b.x, epsilon = 1e-9);
        assert_relative_eq!(a.y, b.y, epsilon = 1e-9);
        assert_relative_eq!(a.yaw, b.yaw, epsilon = 1e-9);
    }

    #[test]
    fn test_pose25_origin_roundtrip() {
        let pose = Pose2D::new(1.5, -2.0, 0.7);
        assert_pose_eq(origin_of(&pose25(&pose)), pose);
    }

    #[test]
    fn test_composition_accumulates_yaw() {
        let a = Pose2D::new(1.0, 0.0, FRAC_PI_2);
        let b = Pose2D::new(1.0, 0.0, FRAC_PI_2);
        let c = origin_of(&(pose25(&a) * pose25(&b)));
        assert_pose_eq(c, Pose2D::new(1.0, 1.0, PI));
    }

    #[test]
    fn test_inverse25() {
        let pose = Pose2D::new(0.3, -1.2, 2.5);
        let m = pose25(&pose);
        let product = m * inverse25(&m);
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-12);

        let product = inverse25(&m) * m;
        assert_relative_eq!(product, Matrix4::identity(), epsilon = 1e-12);
    }

    #[test]
    fn test_rotate3_z_projects_range_reading() {
        let p = project(&(rotate3_z(FRAC_PI_2) * Vector4::new(2.0, 0.0, 0.0, 1.0)));
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_isometry_conversions_agree() {
        let pose = Pose2D::new(-0.5, 4.0, -2.0);
        let iso = isometry_from_pose(&pose);

        assert_pose_eq(origin_of(&from_isometry_25(&iso)), pose);

        let m3 = from_isometry_3(&iso);
        let p = project(&(m3 * Vector4::new(1.0, 0.0, 0.0, 1.0)));
        assert_relative_eq!(p.x, -0.5 + (-2.0f64).cos(), epsilon = 1e-12);
        assert_relative_eq!(p.y, 4.0 + (-2.0f64).sin(), epsilon = 1e-12);
    }

    #[test]
    fn test_yaw_of_quaternion() {
        let q = UnitQuaternion::from_euler_angles(0.0, 0.0, -1.25);
        assert_relative_eq!(yaw_of(&q), -1.25, epsilon = 1e-12);
    }
}
