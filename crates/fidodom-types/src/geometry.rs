//! Rigid-body geometry primitives.
//!
//! [`Vec3`], [`Quaternion`], [`Transform3D`] and [`Pose3D`] are shared by the
//! transform resolver, the pose compositor and the velocity estimator.  All
//! values are `f64`; quaternions use the `(x, y, z, w)` field order.
//!
//! # Example
//!
//! ```rust
//! use fidodom_types::{Quaternion, Transform3D, Vec3};
//!
//! let bin = Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity());
//! let robot = Transform3D::new(Vec3::new(0.5, 0.0, 0.0), Quaternion::identity());
//!
//! // Robot expressed relative to the bin.
//! let delta = bin.inverse_times(&robot);
//! assert!((delta.translation.x + 1.5).abs() < 1e-12);
//! ```

use serde::{Deserialize, Serialize};

/// Norm below which a quaternion is considered degenerate.
const DEGENERATE_NORM: f64 = 1e-12;

// ────────────────────────────────────────────────────────────────────────────
// Vec3
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector (translation, linear rate, or roll/pitch/yaw triple).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    /// Multiply every component by `s`.
    pub fn scale(self, s: f64) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// `true` when every component is finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Quaternion
// ────────────────────────────────────────────────────────────────────────────

/// A rotation quaternion in `(x, y, z, w)` order.
///
/// Rotations are expected to be unit-norm.  The all-zero quaternion is *not*
/// a rotation: it marks an orientation that was never initialised, and
/// [`Quaternion::is_zero`] lets callers detect it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1) when it is used as a rotation.
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation `(0, 0, 0, 1)`.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }

    /// The all-zero "uninitialised" quaternion.
    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// `true` when all four components are exactly zero.
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0 && self.w == 0.0
    }

    /// Build a rotation from roll (X), pitch (Y) and yaw (Z) angles in
    /// radians, applied in fixed-axis X, then Y, then Z order.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self::new(
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
            cr * cp * cy + sr * sp * sy,
        )
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }

    /// Return the unit quaternion pointing the same way.
    ///
    /// A degenerate (near-zero) quaternion normalises to the identity.
    pub fn normalized(self) -> Self {
        let n = self.norm();
        if n < DEGENERATE_NORM {
            return Self::identity();
        }
        Self::new(self.x / n, self.y / n, self.z / n, self.w / n)
    }

    /// Hamilton product: compose two rotations (`self` applied after `rhs`).
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(v.x, v.y, v.z, 0.0);
        let rotated = self.mul(p).mul(self.conjugate());
        Vec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Decompose into `(roll, pitch, yaw)` radians (fixed-axis XYZ), returned
    /// as a [`Vec3`] so the triple can be scaled like a rate.
    ///
    /// Pitch saturates at ±π/2 when the rotation is at gimbal lock.
    pub fn to_rpy(self) -> Vec3 {
        let q = self.normalized();

        let sinr_cosp = 2.0 * (q.w * q.x + q.y * q.z);
        let cosr_cosp = 1.0 - 2.0 * (q.x * q.x + q.y * q.y);
        let roll = sinr_cosp.atan2(cosr_cosp);

        let sinp = 2.0 * (q.w * q.y - q.z * q.x);
        let pitch = sinp.clamp(-1.0, 1.0).asin();

        let siny_cosp = 2.0 * (q.w * q.z + q.x * q.y);
        let cosy_cosp = 1.0 - 2.0 * (q.y * q.y + q.z * q.z);
        let yaw = siny_cosp.atan2(cosy_cosp);

        Vec3::new(roll, pitch, yaw)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Transform3D
// ────────────────────────────────────────────────────────────────────────────

/// A rigid-body 3-D transform: rotation followed by translation.
///
/// Represents the pose of frame B relative to frame A: to convert a point
/// expressed in frame B into frame A, rotate it by `rotation` then add
/// `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl Transform3D {
    pub fn new(translation: Vec3, rotation: Quaternion) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// The identity transform (no translation, no rotation).
    pub fn identity() -> Self {
        Self::new(Vec3::zero(), Quaternion::identity())
    }

    /// Compose two transforms: `self ∘ other`.
    ///
    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(&self, other: &Self) -> Self {
        let translated = self
            .translation
            .add(self.rotation.rotate(other.translation));
        let rotated = self.rotation.mul(other.rotation);
        Self::new(translated, rotated)
    }

    /// The inverse transform: T_A_B → T_B_A.
    pub fn inverse(&self) -> Self {
        let inv_rot = self.rotation.conjugate();
        Self::new(inv_rot.rotate(self.translation).neg(), inv_rot)
    }

    /// `self⁻¹ ∘ other`: `other` expressed relative to `self`.
    pub fn inverse_times(&self, other: &Self) -> Self {
        self.inverse().compose(other)
    }

    /// Map a point from the child frame into the parent frame.
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        self.rotation.rotate(p).add(self.translation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose3D
// ────────────────────────────────────────────────────────────────────────────

/// A stamped pose: position and orientation of a body in `frame_id` at
/// `timestamp` (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pose3D {
    pub position: Vec3,
    pub orientation: Quaternion,
    pub frame_id: String,
    pub timestamp: f64,
}

impl Pose3D {
    pub fn new(
        position: Vec3,
        orientation: Quaternion,
        frame_id: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self {
            position,
            orientation,
            frame_id: frame_id.into(),
            timestamp,
        }
    }

    /// A pose that was never filled in: origin, zero quaternion, time zero.
    pub fn uninitialized(frame_id: impl Into<String>) -> Self {
        Self::new(Vec3::zero(), Quaternion::zero(), frame_id, 0.0)
    }

    /// Build a pose from a transform's translation and rotation.
    pub fn from_transform(
        transform: &Transform3D,
        frame_id: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self::new(transform.translation, transform.rotation, frame_id, timestamp)
    }

    /// The rigid transform with this pose's position and orientation.
    ///
    /// The orientation is normalised, so a slightly-off-unit quaternion from
    /// a detector still yields a proper rotation.
    pub fn to_transform(&self) -> Transform3D {
        Transform3D::new(self.position, self.orientation.normalized())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_2, FRAC_PI_4};

    const EPS: f64 = 1e-9;

    fn assert_vec(v: Vec3, x: f64, y: f64, z: f64) {
        assert!((v.x - x).abs() < EPS, "x: expected {x}, got {}", v.x);
        assert!((v.y - y).abs() < EPS, "y: expected {y}, got {}", v.y);
        assert!((v.z - z).abs() < EPS, "z: expected {z}, got {}", v.z);
    }

    // ── Quaternion ──────────────────────────────────────────────────────────

    #[test]
    fn identity_rotate_is_noop() {
        let r = Quaternion::identity().rotate(Vec3::new(1.0, 2.0, 3.0));
        assert_vec(r, 1.0, 2.0, 3.0);
    }

    #[test]
    fn yaw_90deg_rotates_x_to_y() {
        let q = Quaternion::new(0.0, 0.0, FRAC_1_SQRT_2, FRAC_1_SQRT_2);
        let r = q.rotate(Vec3::new(1.0, 0.0, 0.0));
        assert_vec(r, 0.0, 1.0, 0.0);
    }

    #[test]
    fn conjugate_is_inverse() {
        let q = Quaternion::from_rpy(0.3, -0.2, 1.1);
        let prod = q.mul(q.conjugate());
        assert!((prod.w - 1.0).abs() < EPS);
        assert!(prod.x.abs() < EPS && prod.y.abs() < EPS && prod.z.abs() < EPS);
    }

    #[test]
    fn zero_quaternion_is_detected() {
        assert!(Quaternion::zero().is_zero());
        assert!(!Quaternion::identity().is_zero());
        assert!(!Quaternion::new(0.0, 0.0, 0.0, 1e-300).is_zero());
    }

    #[test]
    fn degenerate_quaternion_normalizes_to_identity() {
        assert_eq!(Quaternion::zero().normalized(), Quaternion::identity());
        let q = Quaternion::new(0.0, 0.0, 0.0, 2.0).normalized();
        assert!((q.w - 1.0).abs() < EPS);
    }

    #[test]
    fn rpy_roundtrip_small_angles() {
        let q = Quaternion::from_rpy(0.1, -0.2, 0.3);
        assert_vec(q.to_rpy(), 0.1, -0.2, 0.3);
    }

    #[test]
    fn rpy_of_pure_yaw() {
        let q = Quaternion::new(0.0, 0.0, FRAC_PI_4.sin(), FRAC_PI_4.cos());
        assert_vec(q.to_rpy(), 0.0, 0.0, FRAC_PI_2);
    }

    #[test]
    fn rpy_pitch_saturates_at_gimbal_lock() {
        let q = Quaternion::from_rpy(0.0, FRAC_PI_2, 0.0);
        let rpy = q.to_rpy();
        assert!((rpy.y - FRAC_PI_2).abs() < 1e-6);
        assert!(rpy.is_finite());
    }

    // ── Transform3D ─────────────────────────────────────────────────────────

    #[test]
    fn compose_translations_add() {
        let t1 = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        let t2 = Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity());
        assert_vec(t1.compose(&t2).translation, 3.0, 0.0, 0.0);
    }

    #[test]
    fn compose_respects_rotation() {
        // Parent rotated 90° about Z; child 1 m along the parent's local +X.
        let parent = Transform3D::new(Vec3::zero(), Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2));
        let child = Transform3D::new(Vec3::new(1.0, 0.0, 0.0), Quaternion::identity());
        assert_vec(parent.compose(&child).translation, 0.0, 1.0, 0.0);
    }

    #[test]
    fn inverse_composes_to_identity() {
        let t = Transform3D::new(Vec3::new(1.0, -2.0, 0.5), Quaternion::from_rpy(0.2, 0.4, -1.0));
        let id = t.compose(&t.inverse());
        assert_vec(id.translation, 0.0, 0.0, 0.0);
        assert!((id.rotation.w.abs() - 1.0).abs() < EPS);
    }

    #[test]
    fn inverse_times_gives_relative_transform() {
        let a = Transform3D::new(Vec3::new(2.0, 0.0, 0.0), Quaternion::identity());
        let b = Transform3D::new(Vec3::new(0.5, -0.1, 0.0), Quaternion::identity());
        assert_vec(a.inverse_times(&b).translation, -1.5, -0.1, 0.0);
    }

    #[test]
    fn transform_point_rotates_then_translates() {
        let t = Transform3D::new(Vec3::new(1.0, 1.0, 0.0), Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2));
        assert_vec(t.transform_point(Vec3::new(1.0, 0.0, 0.0)), 1.0, 2.0, 0.0);
    }

    // ── Pose3D ──────────────────────────────────────────────────────────────

    #[test]
    fn uninitialized_pose_has_zero_orientation() {
        let p = Pose3D::uninitialized("camera_link");
        assert!(p.orientation.is_zero());
        assert_eq!(p.timestamp, 0.0);
        assert_eq!(p.frame_id, "camera_link");
    }

    #[test]
    fn pose_transform_conversion_normalizes_orientation() {
        let p = Pose3D::new(
            Vec3::new(1.0, 2.0, 3.0),
            Quaternion::new(0.0, 0.0, 0.0, 3.0),
            "odom",
            4.0,
        );
        let t = p.to_transform();
        assert_vec(t.translation, 1.0, 2.0, 3.0);
        assert_eq!(t.rotation, Quaternion::identity());

        let back = Pose3D::from_transform(&t, "odom", 4.0);
        assert_eq!(back.position, p.position);
        assert_eq!(back.timestamp, 4.0);
    }
}
