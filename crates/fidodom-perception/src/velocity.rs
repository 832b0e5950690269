//! [`VelocityEstimator`] – twist from consecutive accepted poses.
//!
//! Given the previously accepted pose `P0` and the newly fused pose `P1`:
//!
//! ```text
//! Δ       = P0⁻¹ ∘ P1
//! Δt      = P1.timestamp − P0.timestamp
//! linear  = Δ.translation / Δt
//! angular = rpy(Δ.rotation) / Δt
//! ```
//!
//! The angular term divides each Euler angle independently, which is only a
//! reasonable approximation while the inter-cycle rotation stays small.
//!
//! The one piece of state that survives between cycles, the previous pose,
//! lives in an explicit [`FusionState`] value.  [`VelocityEstimator::estimate`]
//! borrows the current state and hands back the state to adopt once the
//! record has been emitted.

use fidodom_types::{Covariance6, FusionError, OdometryRecord, Pose3D, Quaternion, Twist};
use tracing::debug;

// ────────────────────────────────────────────────────────────────────────────
// FusionState
// ────────────────────────────────────────────────────────────────────────────

/// State retained across fusion cycles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FusionState {
    last_accepted_pose: Option<Pose3D>,
}

impl FusionState {
    /// A state with no accepted pose yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// A state whose previous pose is `pose`.
    pub fn with_pose(pose: Pose3D) -> Self {
        Self {
            last_accepted_pose: Some(pose),
        }
    }

    pub fn last_accepted_pose(&self) -> Option<&Pose3D> {
        self.last_accepted_pose.as_ref()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Estimate
// ────────────────────────────────────────────────────────────────────────────

/// Result of one successful estimation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub record: OdometryRecord,
    /// State to adopt after `record` has been handed to the sink.
    pub next_state: FusionState,
}

// ────────────────────────────────────────────────────────────────────────────
// VelocityEstimator
// ────────────────────────────────────────────────────────────────────────────

/// Builds [`OdometryRecord`]s from fused poses.
#[derive(Debug, Clone)]
pub struct VelocityEstimator {
    odom_frame: String,
    child_frame: String,
    pose_covariance: Covariance6,
    twist_covariance: Covariance6,
}

impl VelocityEstimator {
    /// `odom_frame` and `child_frame` label the emitted records;
    /// the covariance values fill the diagonals of the pose and twist blocks.
    pub fn new(
        odom_frame: impl Into<String>,
        child_frame: impl Into<String>,
        pose_covariance: f64,
        twist_covariance: f64,
    ) -> Self {
        Self {
            odom_frame: odom_frame.into(),
            child_frame: child_frame.into(),
            pose_covariance: Covariance6::diagonal(pose_covariance),
            twist_covariance: Covariance6::diagonal(twist_covariance),
        }
    }

    /// Differentiate `previous` → `current` into a [`Twist`].
    ///
    /// A missing previous pose is treated as the uninitialised pose (origin,
    /// time zero), and a previous orientation that is exactly the zero
    /// quaternion is replaced with the identity before any delta is taken.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::DegenerateTimestep`] when `Δt` is not a finite
    /// positive number.
    pub fn twist(previous: Option<&Pose3D>, current: &Pose3D) -> Result<Twist, FusionError> {
        let previous = bootstrap_previous(previous, &current.frame_id);

        let dt = current.timestamp - previous.timestamp;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(FusionError::DegenerateTimestep { dt });
        }

        let delta = previous.to_transform().inverse_times(&current.to_transform());
        debug!(
            dt,
            dx = delta.translation.x, dy = delta.translation.y, dz = delta.translation.z,
            qx = delta.rotation.x, qy = delta.rotation.y, qz = delta.rotation.z, qw = delta.rotation.w,
            "pose delta"
        );

        Ok(Twist {
            linear: delta.translation.scale(1.0 / dt),
            angular: delta.rotation.to_rpy().scale(1.0 / dt),
        })
    }

    /// Build the odometry record for `current` and the state that follows it.
    ///
    /// `state` is not modified; the caller adopts
    /// [`Estimate::next_state`] once the record has been emitted.
    ///
    /// # Errors
    ///
    /// Propagates [`FusionError::DegenerateTimestep`] from
    /// [`VelocityEstimator::twist`]; the caller keeps its current state.
    pub fn estimate(&self, state: &FusionState, current: Pose3D) -> Result<Estimate, FusionError> {
        let twist = Self::twist(state.last_accepted_pose(), &current)?;

        let record = OdometryRecord {
            timestamp: current.timestamp,
            frame_id: self.odom_frame.clone(),
            child_frame_id: self.child_frame.clone(),
            pose: current.clone(),
            pose_covariance: self.pose_covariance,
            twist_linear: twist.linear,
            twist_angular: twist.angular,
            twist_covariance: self.twist_covariance,
        };

        Ok(Estimate {
            record,
            next_state: FusionState::with_pose(current),
        })
    }
}

fn bootstrap_previous(previous: Option<&Pose3D>, frame_id: &str) -> Pose3D {
    let mut pose = previous
        .cloned()
        .unwrap_or_else(|| Pose3D::uninitialized(frame_id));
    if pose.orientation.is_zero() {
        pose.orientation = Quaternion::identity();
    }
    pose
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
