//! [`SensorRegistry`] – frame sources plus the shared marker detector.
//!
//! The registry stores every registered [`FrameSource`] by identifier.  When
//! the selector asks for a detection from a named sensor, the registry
//! fetches one frame from that source and hands it to the detector.

use std::collections::HashMap;

use fidodom_perception::DetectionCapability;
use fidodom_types::{DetectionResult, FusionError};
use tracing::debug;

use crate::camera::FrameSource;
use crate::detector::MarkerDetector;

/// Central sensor registry and [`DetectionCapability`] implementation.
///
/// Construct with [`SensorRegistry::new`], register frame sources, then pass
/// the registry to the cycle driver.
pub struct SensorRegistry {
    sources: HashMap<String, Box<dyn FrameSource>>,
    detector: Box<dyn MarkerDetector>,
}

impl SensorRegistry {
    /// Create a registry with no sources, backed by `detector`.
    pub fn new(detector: Box<dyn MarkerDetector>) -> Self {
        Self {
            sources: HashMap::new(),
            detector,
        }
    }

    /// Register a frame source.  Any previously registered source with the
    /// same `id` is replaced.
    pub fn register_source(&mut self, source: Box<dyn FrameSource>) {
        self.sources.insert(source.id().to_string(), source);
    }

    /// Identifiers of all registered sources, sorted.
    pub fn source_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sources.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.sources.contains_key(source_id)
    }
}

impl DetectionCapability for SensorRegistry {
    fn request_detection(&mut self, source_id: &str) -> Result<DetectionResult, FusionError> {
        let source = self
            .sources
            .get_mut(source_id)
            .ok_or_else(|| FusionError::SourceUnavailable {
                source_id: source_id.to_string(),
                details: format!("frame source '{source_id}' is not registered"),
            })?;

        let frame = source.fetch()?;
        debug!(
            source_id,
            stamp = frame.image.stamp,
            width = frame.image.width,
            height = frame.image.height,
            "frame captured"
        );

        let mut result = self.detector.detect(&frame)?;
        if result.source_id.is_empty() {
            result.source_id = source_id.to_string();
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraFrame, CameraInfo, CapturedFrame};
    use fidodom_types::{Pose3D, Quaternion, Vec3};

    struct FixedSource {
        id: String,
        fail: bool,
    }

    impl FrameSource for FixedSource {
        fn id(&self) -> &str {
            &self.id
        }

        fn fetch(&mut self) -> Result<CapturedFrame, FusionError> {
            if self.fail {
                return Err(FusionError::SourceUnavailable {
                    source_id: self.id.clone(),
                    details: "usb disconnected".to_string(),
                });
            }
            Ok(CapturedFrame {
                source_id: self.id.clone(),
                image: CameraFrame {
                    width: 1,
                    height: 1,
                    data: vec![0],
                    stamp: 3.0,
                    frame_id: "camera_link".to_string(),
                },
                calibration: CameraInfo::pinhole(1, 1, 1.0),
            })
        }
    }

    /// Sees a marker only in frames from `rear_cam`; leaves `source_id` blank.
    struct RearOnlyDetector;

    impl MarkerDetector for RearOnlyDetector {
        fn detect(&mut self, frame: &CapturedFrame) -> Result<DetectionResult, FusionError> {
            let count = u32::from(frame.source_id == "rear_cam");
            Ok(DetectionResult {
                marker_count: count,
                relative_pose: Pose3D::new(
                    Vec3::new(1.0, 0.0, 0.0),
                    Quaternion::identity(),
                    frame.image.frame_id.clone(),
                    frame.image.stamp,
                ),
                source_id: String::new(),
            })
        }
    }

    fn registry() -> SensorRegistry {
        let mut reg = SensorRegistry::new(Box::new(RearOnlyDetector));
        reg.register_source(Box::new(FixedSource {
            id: "rear_cam".to_string(),
            fail: false,
        }));
        reg.register_source(Box::new(FixedSource {
            id: "kinect".to_string(),
            fail: false,
        }));
        reg
    }

    #[test]
    fn request_runs_detector_on_fetched_frame() {
        let mut reg = registry();
        let result = reg.request_detection("rear_cam").unwrap();
        assert_eq!(result.marker_count, 1);
        assert_eq!(result.relative_pose.timestamp, 3.0);
        assert_eq!(result.source_id, "rear_cam", "blank source id is filled in");

        let result = reg.request_detection("kinect").unwrap();
        assert!(!result.has_markers());
    }

    #[test]
    fn unknown_source_is_unavailable() {
        let mut reg = registry();
        let err = reg.request_detection("lidar").unwrap_err();
        assert!(matches!(err, FusionError::SourceUnavailable { ref source_id, .. } if source_id == "lidar"));
    }

    #[test]
    fn fetch_failure_propagates() {
        let mut reg = registry();
        reg.register_source(Box::new(FixedSource {
            id: "kinect".to_string(),
            fail: true,
        }));
        let err = reg.request_detection("kinect").unwrap_err();
        assert_eq!(err.kind(), "source_unavailable");
    }

    #[test]
    fn register_replaces_and_lists_sorted() {
        let reg = registry();
        assert_eq!(reg.source_ids(), vec!["kinect", "rear_cam"]);
        assert!(reg.contains("kinect"));
        assert!(!reg.contains("lidar"));
    }
}
