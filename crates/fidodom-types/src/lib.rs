//! `fidodom-types` – shared data model for the fiducial odometry stack.
//!
//! Geometry primitives live in [`geometry`] and are re-exported at the crate
//! root.  This module holds the per-cycle records ([`DetectionResult`],
//! [`OdometryRecord`]), the bus [`Event`] envelope and the workspace-wide
//! [`FusionError`].

pub mod geometry;

pub use geometry::{Pose3D, Quaternion, Transform3D, Vec3};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Diagonal value used for both covariance blocks unless configured
/// otherwise.
pub const DEFAULT_COVARIANCE: f64 = 1e-1;

/// Output of one marker-detection request against one sensor.
///
/// `marker_count == 0` means nothing usable was seen; `relative_pose` is
/// meaningless in that case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub marker_count: u32,
    /// Marker pose in the camera frame named by `relative_pose.frame_id`.
    pub relative_pose: Pose3D,
    /// Identifier of the sensor that produced the image, e.g. `"rear_cam"`.
    pub source_id: String,
}

impl DetectionResult {
    /// A result reporting that `source_id` saw no markers.
    pub fn empty(source_id: impl Into<String>) -> Self {
        Self {
            marker_count: 0,
            relative_pose: Pose3D::uninitialized(""),
            source_id: source_id.into(),
        }
    }

    pub fn has_markers(&self) -> bool {
        self.marker_count > 0
    }
}

/// 6x6 covariance matrix over `(x, y, z, roll, pitch, yaw)`, stored by rows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Covariance6(pub [[f64; 6]; 6]);

impl Covariance6 {
    /// A matrix with `value` on every diagonal entry and zeros elsewhere.
    pub fn diagonal(value: f64) -> Self {
        let mut rows = [[0.0; 6]; 6];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = value;
        }
        Self(rows)
    }

    pub fn diagonal_entries(&self) -> [f64; 6] {
        std::array::from_fn(|i| self.0[i][i])
    }

    /// Flattened row-major form (the 36-element layout used on the wire).
    pub fn to_row_major(&self) -> [f64; 36] {
        std::array::from_fn(|i| self.0[i / 6][i % 6])
    }
}

/// Linear and angular rate pair.
///
/// `angular` holds roll, pitch and yaw rates in that order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// One fused odometry estimate, ready for the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryRecord {
    pub timestamp: f64,
    /// Fixed world frame the pose is reported in, e.g. `"odom"`.
    pub frame_id: String,
    /// Robot body frame, e.g. `"footprint"`.
    pub child_frame_id: String,
    pub pose: Pose3D,
    pub pose_covariance: Covariance6,
    pub twist_linear: Vec3,
    pub twist_angular: Vec3,
    pub twist_covariance: Covariance6,
}

/// Unified event wrapper for the odometry event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "fidodom-runtime::cycle"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    /// Wrap `payload` with a fresh id and the current wall-clock time.
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data that can be routed over the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    Odometry(OdometryRecord),
    /// A fusion cycle was abandoned.
    CycleFault(FusionError),
    /// No odometry has been emitted for `silent_secs`.
    OdometryStale { silent_secs: f64 },
}

/// Error type spanning collaborator failures, degenerate input and startup
/// configuration problems.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FusionError {
    #[error("Transform Unavailable: {source_frame} -> {target_frame}: {details}")]
    TransformUnavailable {
        source_frame: String,
        target_frame: String,
        details: String,
    },

    #[error("Source Unavailable: {source_id}: {details}")]
    SourceUnavailable { source_id: String, details: String },

    #[error("Degenerate Timestep: dt = {dt}s between consecutive poses")]
    DegenerateTimestep { dt: f64 },

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Event Bus Error: {0}")]
    Channel(String),
}

impl FusionError {
    /// Short stable label, used as a structured logging field.
    pub fn kind(&self) -> &'static str {
        match self {
            FusionError::TransformUnavailable { .. } => "transform_unavailable",
            FusionError::SourceUnavailable { .. } => "source_unavailable",
            FusionError::DegenerateTimestep { .. } => "degenerate_timestep",
            FusionError::Config(_) => "config",
            FusionError::Channel(_) => "channel",
        }
    }
}
