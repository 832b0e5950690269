//! In-process simulated sensors for headless runs and CI.
//!
//! [`SimCamera`] produces blank frames with a timestamp and can drop frames
//! on a fixed pattern.  [`SimMarkerDetector`] ignores the pixels and
//! synthesises the sighting a camera on a robot driving at constant velocity
//! would report for a bin marker at a known odometry position.  Fed through
//! the pose compositor with an identity camera mount and an unrotated bin
//! anchor, the fused pose reproduces the simulated robot position exactly.
//!
//! # Example
//!
//! ```rust
//! use fidodom_hal::sim::{SimMarkerDetector, SimRegistry};
//! use fidodom_perception::DetectionCapability;
//! use fidodom_types::Vec3;
//!
//! let detector = SimMarkerDetector::new(Vec3::new(2.0, 0.0, 0.0))
//!     .with_motion(Vec3::zero(), Vec3::new(0.5, 0.0, 0.0));
//! let mut registry = SimRegistry::builder()
//!     .with_stepped_camera("rear_cam", "camera_link", 0.0, 0.2)
//!     .with_detector(detector)
//!     .build();
//!
//! let result = registry.request_detection("rear_cam").unwrap();
//! assert_eq!(result.marker_count, 1);
//! ```

use std::collections::HashMap;

use chrono::Utc;
use fidodom_types::{DetectionResult, FusionError, Pose3D, Quaternion, Vec3};

use crate::camera::{CameraFrame, CameraInfo, CapturedFrame, FrameSource};
use crate::detector::MarkerDetector;
use crate::registry::SensorRegistry;

const SIM_WIDTH: u32 = 4;
const SIM_HEIGHT: u32 = 4;

// ────────────────────────────────────────────────────────────────────────────
// Simulated camera
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum SimClock {
    Wall,
    Stepped { next: f64, step: f64 },
}

impl SimClock {
    fn now(&mut self) -> f64 {
        match self {
            SimClock::Wall => Utc::now().timestamp_micros() as f64 / 1e6,
            SimClock::Stepped { next, step } => {
                let stamp = *next;
                *next += *step;
                stamp
            }
        }
    }
}

/// A simulated camera that returns a blank 4×4 greyscale frame.
pub struct SimCamera {
    id: String,
    frame_id: String,
    clock: SimClock,
    drop_every: Option<u64>,
    fetches: u64,
}

impl SimCamera {
    /// A camera stamping frames with the current wall-clock time.
    pub fn new(id: impl Into<String>, frame_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            frame_id: frame_id.into(),
            clock: SimClock::Wall,
            drop_every: None,
            fetches: 0,
        }
    }

    /// Stamp frames `start`, `start + step`, … instead of wall-clock time.
    pub fn with_stepped_clock(mut self, start: f64, step: f64) -> Self {
        self.clock = SimClock::Stepped { next: start, step };
        self
    }

    /// Fail every `n`-th fetch with `SourceUnavailable`.  `0` disables
    /// dropouts.
    pub fn with_dropout(mut self, n: u64) -> Self {
        self.drop_every = (n > 0).then_some(n);
        self
    }
}

impl FrameSource for SimCamera {
    fn id(&self) -> &str {
        &self.id
    }

    fn fetch(&mut self) -> Result<CapturedFrame, FusionError> {
        self.fetches += 1;
        let stamp = self.clock.now();
        if let Some(n) = self.drop_every
            && self.fetches % n == 0
        {
            return Err(FusionError::SourceUnavailable {
                source_id: self.id.clone(),
                details: format!("simulated dropout on fetch {}", self.fetches),
            });
        }
        Ok(CapturedFrame {
            source_id: self.id.clone(),
            image: CameraFrame {
                width: SIM_WIDTH,
                height: SIM_HEIGHT,
                data: vec![0u8; (SIM_WIDTH * SIM_HEIGHT) as usize],
                stamp,
                frame_id: self.frame_id.clone(),
            },
            calibration: CameraInfo::pinhole(SIM_WIDTH, SIM_HEIGHT, 2.0),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Simulated detector
// ────────────────────────────────────────────────────────────────────────────

/// Synthesises bin-marker sightings for a robot in straight-line motion.
///
/// Robot position at time `t` is `start + velocity * (t - t0)`, where `t0`
/// is the stamp of the first frame the detector sees.
pub struct SimMarkerDetector {
    bin: Vec3,
    start: Vec3,
    velocity: Vec3,
    t0: Option<f64>,
    visibility: HashMap<String, u64>,
    calls: HashMap<String, u64>,
}

impl SimMarkerDetector {
    /// A stationary robot at the odometry origin looking at a bin at `bin`.
    pub fn new(bin: Vec3) -> Self {
        Self {
            bin,
            start: Vec3::zero(),
            velocity: Vec3::zero(),
            t0: None,
            visibility: HashMap::new(),
            calls: HashMap::new(),
        }
    }

    pub fn with_motion(mut self, start: Vec3, velocity: Vec3) -> Self {
        self.start = start;
        self.velocity = velocity;
        self
    }

    /// Let `source_id` see the marker only on every `visible_one_in`-th
    /// frame.  `0` hides the marker from that source entirely.
    pub fn occlude_source(mut self, source_id: impl Into<String>, visible_one_in: u64) -> Self {
        self.visibility.insert(source_id.into(), visible_one_in);
        self
    }

    /// Simulated robot position at `stamp`.
    pub fn robot_position(&self, stamp: f64) -> Vec3 {
        let elapsed = self.t0.map_or(0.0, |t0| stamp - t0);
        self.start.add(self.velocity.scale(elapsed))
    }

    fn visible(&mut self, source_id: &str) -> bool {
        let calls = self.calls.entry(source_id.to_string()).or_insert(0);
        *calls += 1;
        match self.visibility.get(source_id) {
            None => true,
            Some(0) => false,
            Some(n) => *calls % n == 0,
        }
    }
}

impl MarkerDetector for SimMarkerDetector {
    fn detect(&mut self, frame: &CapturedFrame) -> Result<DetectionResult, FusionError> {
        let stamp = frame.image.stamp;
        self.t0.get_or_insert(stamp);

        if !self.visible(&frame.source_id) {
            return Ok(DetectionResult::empty(&frame.source_id));
        }

        // Vision convention: y and z point the opposite way to the body axes.
        let offset = self.bin.sub(self.robot_position(stamp));
        let sighting = Vec3::new(offset.x, -offset.y, -offset.z);
        Ok(DetectionResult {
            marker_count: 1,
            relative_pose: Pose3D::new(
                sighting,
                Quaternion::identity(),
                frame.image.frame_id.clone(),
                stamp,
            ),
            source_id: frame.source_id.clone(),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRegistry builder
// ────────────────────────────────────────────────────────────────────────────

/// Builder that constructs a [`SensorRegistry`] populated with simulated
/// cameras and a [`SimMarkerDetector`].
#[derive(Default)]
pub struct SimRegistry {
    cameras: Vec<SimCamera>,
    detector: Option<SimMarkerDetector>,
}

impl SimRegistry {
    pub fn builder() -> Self {
        Self::default()
    }

    /// Add a wall-clock camera.
    pub fn with_camera(mut self, id: &str, frame_id: &str) -> Self {
        self.cameras.push(SimCamera::new(id, frame_id));
        self
    }

    /// Add a camera with a deterministic stepped clock.
    pub fn with_stepped_camera(mut self, id: &str, frame_id: &str, start: f64, step: f64) -> Self {
        self.cameras
            .push(SimCamera::new(id, frame_id).with_stepped_clock(start, step));
        self
    }

    /// Add a fully configured camera.
    pub fn with_sim_camera(mut self, camera: SimCamera) -> Self {
        self.cameras.push(camera);
        self
    }

    pub fn with_detector(mut self, detector: SimMarkerDetector) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Consume the builder.  Without an explicit detector, a stationary
    /// robot 1 m behind a bin at the origin is simulated.
    pub fn build(self) -> SensorRegistry {
        let detector = self.detector.unwrap_or_else(|| {
            SimMarkerDetector::new(Vec3::zero()).with_motion(Vec3::new(-1.0, 0.0, 0.0), Vec3::zero())
        });
        let mut registry = SensorRegistry::new(Box::new(detector));
        for camera in self.cameras {
            registry.register_source(Box::new(camera));
        }
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fidodom_perception::DetectionCapability;

    #[test]
    fn stepped_clock_advances_per_fetch() {
        let mut cam = SimCamera::new("rear_cam", "camera_link").with_stepped_clock(10.0, 0.5);
        assert_eq!(cam.fetch().unwrap().image.stamp, 10.0);
        assert_eq!(cam.fetch().unwrap().image.stamp, 10.5);
        assert_eq!(cam.fetch().unwrap().image.stamp, 11.0);
    }

    #[test]
    fn wall_clock_stamps_are_recent() {
        let mut cam = SimCamera::new("rear_cam", "camera_link");
        let frame = cam.fetch().unwrap();
        let now = Utc::now().timestamp() as f64;
        assert!((frame.image.stamp - now).abs() < 5.0);
        assert_eq!(frame.image.data.len(), 16);
        assert_eq!(frame.image.frame_id, "camera_link");
    }

    #[test]
    fn dropout_fails_every_nth_fetch() {
        let mut cam = SimCamera::new("kinect", "camera_link")
            .with_stepped_clock(0.0, 1.0)
            .with_dropout(3);
        assert!(cam.fetch().is_ok());
        assert!(cam.fetch().is_ok());
        let err = cam.fetch().unwrap_err();
        assert!(matches!(err, FusionError::SourceUnavailable { ref source_id, .. } if source_id == "kinect"));
        assert!(cam.fetch().is_ok());
    }

    #[test]
    fn sighting_uses_vision_axis_convention() {
        let mut cam = SimCamera::new("rear_cam", "camera_link").with_stepped_clock(0.0, 1.0);
        let mut det = SimMarkerDetector::new(Vec3::new(2.0, 1.0, 0.5));
        let result = det.detect(&cam.fetch().unwrap()).unwrap();
        assert_eq!(result.marker_count, 1);
        assert_eq!(result.relative_pose.position, Vec3::new(2.0, -1.0, -0.5));
        assert_eq!(result.relative_pose.frame_id, "camera_link");
    }

    #[test]
    fn robot_moves_relative_to_first_frame() {
        let mut cam = SimCamera::new("rear_cam", "camera_link").with_stepped_clock(100.0, 2.0);
        let mut det = SimMarkerDetector::new(Vec3::new(5.0, 0.0, 0.0))
            .with_motion(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.0, 0.0));
        det.detect(&cam.fetch().unwrap()).unwrap();
        let second = det.detect(&cam.fetch().unwrap()).unwrap();
        // robot at 1 + 0.5 * 2 = 2, bin at 5
        assert!((second.relative_pose.position.x - 3.0).abs() < 1e-12);
        assert!((det.robot_position(104.0).x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn occluded_source_sees_marker_intermittently() {
        let mut cam = SimCamera::new("rear_cam", "camera_link").with_stepped_clock(0.0, 1.0);
        let mut det = SimMarkerDetector::new(Vec3::zero()).occlude_source("rear_cam", 2);
        let counts: Vec<u32> = (0..4)
            .map(|_| det.detect(&cam.fetch().unwrap()).unwrap().marker_count)
            .collect();
        assert_eq!(counts, vec![0, 1, 0, 1]);
    }

    #[test]
    fn hidden_source_never_sees_marker() {
        let mut cam = SimCamera::new("rear_cam", "camera_link").with_stepped_clock(0.0, 1.0);
        let mut det = SimMarkerDetector::new(Vec3::zero()).occlude_source("rear_cam", 0);
        for _ in 0..3 {
            assert!(!det.detect(&cam.fetch().unwrap()).unwrap().has_markers());
        }
    }

    #[test]
    fn builder_registers_all_cameras() {
        let mut registry = SimRegistry::builder()
            .with_stepped_camera("rear_cam", "camera_link", 0.0, 0.2)
            .with_camera("kinect", "camera_link")
            .build();
        assert_eq!(registry.source_ids(), vec!["kinect", "rear_cam"]);
        let result = registry.request_detection("rear_cam").unwrap();
        assert_eq!(result.source_id, "rear_cam");
        assert!(registry.request_detection("lidar").is_err());
    }
}
