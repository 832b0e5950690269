//! [`DetectionSelector`] – short-circuit fallback over redundant sensors.
//!
//! The selector asks each sensor for a detection in the configured order and
//! stops at the first one that reports at least one marker.  Only that one
//! result is used for the cycle; results are never merged.
//!
//! A sensor that fails outright is logged and skipped so the remaining
//! sensors still get their turn.  If nothing was detected and some sensor
//! failed, the last failure is returned so the cycle is reported as
//! abandoned rather than silently empty.

use fidodom_types::{DetectionResult, FusionError};
use tracing::{debug, warn};

/// Capability to request one marker detection from a named sensor.
///
/// Implemented by the hardware registry; tests provide canned doubles.
pub trait DetectionCapability: Send {
    /// # Errors
    ///
    /// Returns [`FusionError::SourceUnavailable`] if the sensor or detector
    /// cannot be reached.
    fn request_detection(&mut self, source_id: &str) -> Result<DetectionResult, FusionError>;
}

/// Ordered fallback chain over sensor identifiers.
#[derive(Debug, Clone)]
pub struct DetectionSelector {
    order: Vec<String>,
}

impl DetectionSelector {
    /// Create a selector that tries `order[0]` first, then `order[1]`, …
    pub fn new(order: Vec<String>) -> Self {
        Self { order }
    }

    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Run the fallback chain once.
    ///
    /// Returns `Ok(Some(result))` for the first source with
    /// `marker_count > 0`, or `Ok(None)` when every source saw nothing.
    ///
    /// # Errors
    ///
    /// Returns the last [`FusionError::SourceUnavailable`] when no source
    /// produced a detection and at least one of them failed.
    pub fn select(
        &self,
        capability: &mut dyn DetectionCapability,
    ) -> Result<Option<DetectionResult>, FusionError> {
        let mut last_failure = None;

        for source_id in &self.order {
            match capability.request_detection(source_id) {
                Ok(result) if result.has_markers() => {
                    debug!(
                        source_id = %source_id,
                        marker_count = result.marker_count,
                        "detection accepted"
                    );
                    return Ok(Some(result));
                }
                Ok(_) => debug!(source_id = %source_id, "no markers visible"),
                Err(e) => {
                    warn!(source_id = %source_id, error = %e, "detection source failed; trying next");
                    last_failure = Some(e);
                }
            }
        }

        match last_failure {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use fidodom_types::{Pose3D, Quaternion, Vec3};
    use std::collections::HashMap;

    /// Returns canned results per source and records the call order.
    struct CannedSources {
        results: HashMap<String, Result<DetectionResult, FusionError>>,
        calls: Vec<String>,
    }

    impl CannedSources {
        fn new() -> Self {
            Self {
                results: HashMap::new(),
                calls: Vec::new(),
            }
        }

        fn with_markers(mut self, id: &str, count: u32, x: f64) -> Self {
            let result = DetectionResult {
                marker_count: count,
                relative_pose: Pose3D::new(
                    Vec3::new(x, 0.0, 0.0),
                    Quaternion::identity(),
                    "camera_link",
                    1.0,
                ),
                source_id: id.to_string(),
            };
            self.results.insert(id.to_string(), Ok(result));
            self
        }

        fn with_failure(mut self, id: &str) -> Self {
            self.results.insert(
                id.to_string(),
                Err(FusionError::SourceUnavailable {
                    source_id: id.to_string(),
                    details: "camera unplugged".to_string(),
                }),
            );
            self
        }
    }

    impl DetectionCapability for CannedSources {
        fn request_detection(&mut self, source_id: &str) -> Result<DetectionResult, FusionError> {
            self.calls.push(source_id.to_string());
            self.results
                .get(source_id)
                .cloned()
                .unwrap_or_else(|| Ok(DetectionResult::empty(source_id)))
        }
    }

    fn selector() -> DetectionSelector {
        DetectionSelector::new(vec!["rear_cam".to_string(), "kinect".to_string()])
    }

    #[test]
    fn all_sources_empty_yields_none() {
        let mut sources = CannedSources::new()
            .with_markers("rear_cam", 0, 0.0)
            .with_markers("kinect", 0, 0.0);
        assert_eq!(selector().select(&mut sources).unwrap(), None);
        assert_eq!(sources.calls, vec!["rear_cam", "kinect"]);
    }

    #[test]
    fn falls_back_to_second_source() {
        let mut sources = CannedSources::new()
            .with_markers("rear_cam", 0, 9.0)
            .with_markers("kinect", 2, 0.5);
        let result = selector().select(&mut sources).unwrap().unwrap();
        assert_eq!(result.source_id, "kinect");
        assert_eq!(result.marker_count, 2);
        assert!((result.relative_pose.position.x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn first_source_with_markers_short_circuits() {
        let mut sources = CannedSources::new()
            .with_markers("rear_cam", 1, 0.1)
            .with_markers("kinect", 4, 0.2);
        let result = selector().select(&mut sources).unwrap().unwrap();
        assert_eq!(result.source_id, "rear_cam");
        assert_eq!(sources.calls, vec!["rear_cam"], "kinect must not be queried");
    }

    #[test]
    fn failed_source_is_skipped() {
        let mut sources = CannedSources::new()
            .with_failure("rear_cam")
            .with_markers("kinect", 1, 0.3);
        let result = selector().select(&mut sources).unwrap().unwrap();
        assert_eq!(result.source_id, "kinect");
    }

    #[test]
    fn failure_without_any_detection_is_reported() {
        let mut sources = CannedSources::new()
            .with_failure("rear_cam")
            .with_markers("kinect", 0, 0.0);
        let err = selector().select(&mut sources).unwrap_err();
        assert!(matches!(err, FusionError::SourceUnavailable { ref source_id, .. } if source_id == "rear_cam"));
    }

    #[test]
    fn empty_order_yields_none() {
        let mut sources = CannedSources::new().with_markers("rear_cam", 1, 0.0);
        let selector = DetectionSelector::new(Vec::new());
        assert_eq!(selector.select(&mut sources).unwrap(), None);
        assert!(sources.calls.is_empty());
    }
}
