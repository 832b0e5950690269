//! [`MarkerDetector`] – the fiducial detection capability.
//!
//! The vision pipeline itself lives behind this trait.  A detector receives
//! a whole [`CapturedFrame`] and answers with a single [`DetectionResult`];
//! there are no partial results.

use fidodom_types::{DetectionResult, FusionError};

use crate::camera::CapturedFrame;

/// Synchronous marker detector shared by every sensor.
pub trait MarkerDetector: Send {
    /// Detect markers in `frame`.
    ///
    /// The returned result's `source_id` should be `frame.source_id`, and its
    /// `relative_pose` is expressed in `frame.image.frame_id` at
    /// `frame.image.stamp`.  A frame with no visible marker yields
    /// `marker_count == 0`, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::SourceUnavailable`] if the detector cannot be
    /// reached.
    fn detect(&mut self, frame: &CapturedFrame) -> Result<DetectionResult, FusionError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraFrame, CameraInfo};
    use fidodom_types::{Pose3D, Quaternion, Vec3};

    /// Sees one marker straight ahead in every non-empty frame.
    struct CentreDetector;

    impl MarkerDetector for CentreDetector {
        fn detect(&mut self, frame: &CapturedFrame) -> Result<DetectionResult, FusionError> {
            if frame.image.data.is_empty() {
                return Ok(DetectionResult::empty(&frame.source_id));
            }
            Ok(DetectionResult {
                marker_count: 1,
                relative_pose: Pose3D::new(
                    Vec3::new(0.0, 0.0, 1.0),
                    Quaternion::identity(),
                    frame.image.frame_id.clone(),
                    frame.image.stamp,
                ),
                source_id: frame.source_id.clone(),
            })
        }
    }

    fn frame(data: Vec<u8>) -> CapturedFrame {
        CapturedFrame {
            source_id: "kinect".to_string(),
            image: CameraFrame {
                width: 1,
                height: 1,
                data,
                stamp: 9.0,
                frame_id: "kinect_rgb".to_string(),
            },
            calibration: CameraInfo::pinhole(1, 1, 1.0),
        }
    }

    #[test]
    fn detection_inherits_frame_metadata() {
        let result = CentreDetector.detect(&frame(vec![255])).unwrap();
        assert_eq!(result.marker_count, 1);
        assert_eq!(result.source_id, "kinect");
        assert_eq!(result.relative_pose.frame_id, "kinect_rgb");
        assert_eq!(result.relative_pose.timestamp, 9.0);
    }

    #[test]
    fn empty_frame_is_no_detection_not_error() {
        let result = CentreDetector.detect(&frame(Vec::new())).unwrap();
        assert!(!result.has_markers());
    }
}
