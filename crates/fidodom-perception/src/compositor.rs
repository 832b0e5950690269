//! [`PoseCompositor`] – camera-relative marker pose → odometry-frame pose.
//!
//! The marker detector reports where the bin marker sits relative to the
//! camera.  Because the bin's position in the odometry frame is known, that
//! sighting can be turned around into the robot's position relative to the
//! bin anchor:
//!
//! ```text
//! processed = T(footprint ← camera) ∘ marker_pose
//! processed.translation.{y,z} *= -1          vision → body axis convention
//! delta     = T(odom ← bin)⁻¹ ∘ processed
//! delta.translation *= -1                     bin-from-robot → robot-from-bin
//! ```
//!
//! Both sign flips are fixed conventions and are applied exactly as shown.

use fidodom_types::{DetectionResult, FusionError, Pose3D, Transform3D, Vec3};
use tracing::debug;

use crate::transform::TransformResolver;

/// Names of the frames the compositor works with.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameIds {
    /// Frame stamped on the fused pose, e.g. `"camera_link"`.
    pub camera: String,
    /// Robot body frame, e.g. `"footprint"`.
    pub footprint: String,
    /// Bin anchor frame, e.g. `"bin_footprint"`.
    pub bin: String,
    /// Fixed world frame, e.g. `"odom"`.
    pub odom: String,
}

impl Default for FrameIds {
    fn default() -> Self {
        Self {
            camera: "camera_link".to_string(),
            footprint: "footprint".to_string(),
            bin: "bin_footprint".to_string(),
            odom: "odom".to_string(),
        }
    }
}

/// Negate the Y and Z translation components.
///
/// Converts the re-expressed marker translation from the vision axis
/// convention into the robot body convention.  Rotation is left untouched.
pub fn correct_camera_axes(transform: Transform3D) -> Transform3D {
    let t = transform.translation;
    Transform3D::new(Vec3::new(t.x, -t.y, -t.z), transform.rotation)
}

/// Turns a [`DetectionResult`] into a fused robot pose.
#[derive(Debug, Clone)]
pub struct PoseCompositor {
    frames: FrameIds,
}

impl PoseCompositor {
    pub fn new(frames: FrameIds) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &FrameIds {
        &self.frames
    }

    /// Compose the fused pose for one accepted detection.
    ///
    /// The result carries the detection's timestamp and is stamped with the
    /// camera frame id.  A detection pose with an empty `frame_id` is taken
    /// to be in the configured camera frame.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::TransformUnavailable`] if either the
    /// camera→footprint or the odom→bin transform cannot be resolved.
    pub fn compose(
        &self,
        detection: &DetectionResult,
        resolver: &dyn TransformResolver,
    ) -> Result<Pose3D, FusionError> {
        let raw = &detection.relative_pose;
        let stamp = raw.timestamp;
        let camera_frame = if raw.frame_id.is_empty() {
            self.frames.camera.as_str()
        } else {
            raw.frame_id.as_str()
        };
        debug!(
            source_id = %detection.source_id,
            frame = camera_frame,
            x = raw.position.x, y = raw.position.y, z = raw.position.z,
            "unprocessed marker pose"
        );

        let footprint_from_camera = resolver.resolve(&self.frames.footprint, camera_frame, stamp)?;
        let processed = correct_camera_axes(footprint_from_camera.compose(&raw.to_transform()));
        debug!(
            frame = %self.frames.footprint,
            x = processed.translation.x, y = processed.translation.y, z = processed.translation.z,
            "processed marker pose"
        );

        let odom_from_bin = resolver.resolve(&self.frames.odom, &self.frames.bin, stamp)?;
        debug!(
            x = odom_from_bin.translation.x, y = odom_from_bin.translation.y, z = odom_from_bin.translation.z,
            "bin anchor"
        );

        let delta = odom_from_bin.inverse_times(&processed);
        let relative = Transform3D::new(delta.translation.neg(), delta.rotation);
        debug!(
            x = relative.translation.x, y = relative.translation.y, z = relative.translation.z,
            "relative robot pose"
        );

        Ok(Pose3D::from_transform(&relative, self.frames.camera.clone(), stamp))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::TfEngine;
    use fidodom_types::Quaternion;
    use std::f64::consts::FRAC_PI_2;

    fn detection(x: f64, y: f64, z: f64, stamp: f64) -> DetectionResult {
        DetectionResult {
            marker_count: 1,
            relative_pose: Pose3D::new(Vec3::new(x, y, z), Quaternion::identity(), "camera_link", stamp),
            source_id: "kinect".to_string(),
        }
    }

    /// Camera coincides with the footprint, bin at `bin_x` along odom +X.
    fn tf_with_bin_at(bin_x: f64) -> TfEngine {
        let mut tf = TfEngine::new();
        tf.set_transform("footprint", "camera_link", Transform3D::identity());
        tf.set_transform(
            "odom",
            "bin_footprint",
            Transform3D::new(Vec3::new(bin_x, 0.0, 0.0), Quaternion::identity()),
        );
        tf
    }

    #[test]
    fn camera_axis_correction_negates_y_and_z() {
        let t = Transform3D::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity());
        let c = correct_camera_axes(t);
        assert_eq!(c.translation, Vec3::new(1.0, -2.0, -3.0));
        assert_eq!(c.rotation, Quaternion::identity());
    }

    #[test]
    fn fused_pose_for_bin_sighting() {
        // corrected (0.5, -0.1, 0) ; bin⁻¹ ∘ corrected = (-1.5, -0.1, 0) ; negated.
        let compositor = PoseCompositor::new(FrameIds::default());
        let pose = compositor
            .compose(&detection(0.5, 0.1, 0.0, 7.0), &tf_with_bin_at(2.0))
            .unwrap();
        assert!((pose.position.x - 1.5).abs() < 1e-12, "x={}", pose.position.x);
        assert!((pose.position.y - 0.1).abs() < 1e-12, "y={}", pose.position.y);
        assert!(pose.position.z.abs() < 1e-12);
        assert_eq!(pose.orientation, Quaternion::identity());
    }

    #[test]
    fn fused_pose_keeps_stamp_and_camera_frame() {
        let frames = FrameIds {
            camera: "rear_cam_link".to_string(),
            ..FrameIds::default()
        };
        let mut tf = tf_with_bin_at(1.0);
        tf.set_transform("footprint", "rear_cam_link", Transform3D::identity());
        let compositor = PoseCompositor::new(frames);
        let mut det = detection(1.0, 0.0, 0.0, 42.25);
        det.relative_pose.frame_id = "rear_cam_link".to_string();
        let pose = compositor.compose(&det, &tf).unwrap();
        assert_eq!(pose.timestamp, 42.25);
        assert_eq!(pose.frame_id, "rear_cam_link");
    }

    #[test]
    fn footprint_transform_is_applied_before_sign_correction() {
        // Camera mounted 0.2 m above the footprint: processed z = 0.2 + 0.3,
        // corrected z = -0.5, bin at origin, final z = +0.5.
        let mut tf = TfEngine::new();
        tf.set_transform(
            "footprint",
            "camera_link",
            Transform3D::new(Vec3::new(0.0, 0.0, 0.2), Quaternion::identity()),
        );
        tf.set_transform("odom", "bin_footprint", Transform3D::identity());
        let pose = PoseCompositor::new(FrameIds::default())
            .compose(&detection(1.0, 2.0, 0.3, 1.0), &tf)
            .unwrap();
        assert!((pose.position.x + 1.0).abs() < 1e-12);
        assert!((pose.position.y - 2.0).abs() < 1e-12);
        assert!((pose.position.z - 0.5).abs() < 1e-12);
    }

    #[test]
    fn rotated_bin_anchor_rotates_relative_pose() {
        // Bin yawed 90° at the origin: corrected (1, 0, 0) in odom is
        // (0, -1, 0) in bin coordinates, negated to (0, 1, 0).
        let mut tf = TfEngine::new();
        tf.set_transform("footprint", "camera_link", Transform3D::identity());
        tf.set_transform(
            "odom",
            "bin_footprint",
            Transform3D::new(Vec3::zero(), Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2)),
        );
        let pose = PoseCompositor::new(FrameIds::default())
            .compose(&detection(1.0, 0.0, 0.0, 1.0), &tf)
            .unwrap();
        assert!(pose.position.x.abs() < 1e-12, "x={}", pose.position.x);
        assert!((pose.position.y - 1.0).abs() < 1e-12, "y={}", pose.position.y);
        assert!((pose.orientation.to_rpy().z + FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn empty_frame_id_falls_back_to_camera_frame() {
        let mut det = detection(0.5, 0.0, 0.0, 1.0);
        det.relative_pose.frame_id.clear();
        let pose = PoseCompositor::new(FrameIds::default())
            .compose(&det, &tf_with_bin_at(2.0))
            .unwrap();
        assert!((pose.position.x - 1.5).abs() < 1e-12);
    }

    #[test]
    fn missing_footprint_transform_abandons() {
        let mut tf = TfEngine::new();
        tf.set_transform("odom", "bin_footprint", Transform3D::identity());
        let err = PoseCompositor::new(FrameIds::default())
            .compose(&detection(0.5, 0.0, 0.0, 1.0), &tf)
            .unwrap_err();
        assert!(matches!(
            err,
            FusionError::TransformUnavailable { ref target_frame, .. } if target_frame == "camera_link"
        ));
    }

    #[test]
    fn missing_bin_transform_abandons() {
        let mut tf = TfEngine::new();
        tf.set_transform("footprint", "camera_link", Transform3D::identity());
        let err = PoseCompositor::new(FrameIds::default())
            .compose(&detection(0.5, 0.0, 0.0, 1.0), &tf)
            .unwrap_err();
        assert!(matches!(
            err,
            FusionError::TransformUnavailable { ref target_frame, .. } if target_frame == "bin_footprint"
        ));
    }
}
