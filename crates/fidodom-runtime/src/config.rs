//! [`FusionConfig`] – the validated parameter set of the fusion node.
//!
//! Every field has a serde default, so an empty TOML document deserialises
//! to the stock configuration.  Call [`FusionConfig::validate`] before
//! building a driver; any violation is fatal at startup.

use std::collections::HashSet;
use std::time::Duration;

use fidodom_perception::{FrameIds, TfEngine};
use fidodom_types::{DEFAULT_COVARIANCE, FusionError, Quaternion, Transform3D, Vec3};
use serde::{Deserialize, Serialize};

/// Tolerance on `|q| - 1` for static transform rotations.
const UNIT_QUATERNION_TOLERANCE: f64 = 1e-6;

/// Highest accepted cycle rate; anything faster rounds the period to zero.
const MAX_RATE_HZ: f64 = 1e9;

/// Longest accepted cycle period or staleness window.
const MAX_WINDOW_SECS: f64 = 86_400.0;

/// A fixed parent→child transform loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTransform {
    pub parent: String,
    pub child: String,
    #[serde(default)]
    pub translation: [f64; 3],
    /// Quaternion as `[x, y, z, w]`.
    #[serde(default = "identity_rotation")]
    pub rotation: [f64; 4],
}

impl StaticTransform {
    pub fn new(parent: &str, child: &str, translation: [f64; 3], rotation: [f64; 4]) -> Self {
        Self {
            parent: parent.to_string(),
            child: child.to_string(),
            translation,
            rotation,
        }
    }

    pub fn to_transform(&self) -> Transform3D {
        let [tx, ty, tz] = self.translation;
        let [qx, qy, qz, qw] = self.rotation;
        Transform3D::new(Vec3::new(tx, ty, tz), Quaternion::new(qx, qy, qz, qw))
    }
}

/// Runtime parameters of the fusion cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    #[serde(default = "default_camera_frame")]
    pub camera_frame: String,

    #[serde(default = "default_footprint_frame")]
    pub footprint_frame: String,

    #[serde(default = "default_bin_frame")]
    pub bin_frame: String,

    #[serde(default = "default_odom_frame")]
    pub odom_frame: String,

    /// Cycle frequency in Hz.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Raises the default log filter to `debug`.
    #[serde(default)]
    pub debug_logging: bool,

    /// Fallback order of detection sources.
    #[serde(default = "default_sensor_order")]
    pub sensor_order: Vec<String>,

    #[serde(default = "default_covariance")]
    pub pose_covariance: f64,

    #[serde(default = "default_covariance")]
    pub twist_covariance: f64,

    /// Seconds without an emitted record before the watchdog warns.
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: f64,

    #[serde(default)]
    pub static_transforms: Vec<StaticTransform>,
}

fn default_camera_frame() -> String {
    "camera_link".to_string()
}
fn default_footprint_frame() -> String {
    "footprint".to_string()
}
fn default_bin_frame() -> String {
    "bin_footprint".to_string()
}
fn default_odom_frame() -> String {
    "odom".to_string()
}
fn default_rate_hz() -> f64 {
    5.0
}
fn default_sensor_order() -> Vec<String> {
    vec!["rear_cam".to_string(), "kinect".to_string()]
}
fn default_covariance() -> f64 {
    DEFAULT_COVARIANCE
}
fn default_stale_after_secs() -> f64 {
    5.0
}
fn identity_rotation() -> [f64; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            camera_frame: default_camera_frame(),
            footprint_frame: default_footprint_frame(),
            bin_frame: default_bin_frame(),
            odom_frame: default_odom_frame(),
            rate_hz: default_rate_hz(),
            debug_logging: false,
            sensor_order: default_sensor_order(),
            pose_covariance: default_covariance(),
            twist_covariance: default_covariance(),
            stale_after_secs: default_stale_after_secs(),
            static_transforms: Vec::new(),
        }
    }
}

impl FusionConfig {
    /// Check every field, returning the first violation found.
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] describing the offending field.
    pub fn validate(&self) -> Result<(), FusionError> {
        for (field, name) in [
            ("camera_frame", &self.camera_frame),
            ("footprint_frame", &self.footprint_frame),
            ("bin_frame", &self.bin_frame),
            ("odom_frame", &self.odom_frame),
        ] {
            validate_frame_name(field, name)?;
        }

        cycle_period(self.rate_hz)?;
        validate_positive("pose_covariance", self.pose_covariance)?;
        validate_positive("twist_covariance", self.twist_covariance)?;
        self.stale_window()?;

        if self.sensor_order.is_empty() {
            return Err(FusionError::Config(
                "sensor_order must name at least one source".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for id in &self.sensor_order {
            if id.trim().is_empty() {
                return Err(FusionError::Config(
                    "sensor_order contains an empty source id".to_string(),
                ));
            }
            if !seen.insert(id.as_str()) {
                return Err(FusionError::Config(format!(
                    "sensor_order lists '{id}' more than once"
                )));
            }
        }

        for st in &self.static_transforms {
            validate_frame_name("static_transforms.parent", &st.parent)?;
            validate_frame_name("static_transforms.child", &st.child)?;
            if st.translation.iter().any(|v| !v.is_finite()) {
                return Err(FusionError::Config(format!(
                    "static transform {} -> {} has a non-finite translation",
                    st.parent, st.child
                )));
            }
            let norm = st.rotation.iter().map(|v| v * v).sum::<f64>().sqrt();
            if !((norm - 1.0).abs() <= UNIT_QUATERNION_TOLERANCE) {
                return Err(FusionError::Config(format!(
                    "static transform {} -> {} rotation is not a unit quaternion (|q| = {norm})",
                    st.parent, st.child
                )));
            }
        }
        Ok(())
    }

    /// `stale_after_secs` as a [`Duration`].
    ///
    /// # Errors
    ///
    /// Returns [`FusionError::Config`] unless the value is positive and at
    /// most one day.
    pub fn stale_window(&self) -> Result<Duration, FusionError> {
        bounded_duration("stale_after_secs", self.stale_after_secs)
    }

    pub fn frame_ids(&self) -> FrameIds {
        FrameIds {
            camera: self.camera_frame.clone(),
            footprint: self.footprint_frame.clone(),
            bin: self.bin_frame.clone(),
            odom: self.odom_frame.clone(),
        }
    }

    /// A transform tree holding every configured static transform.
    pub fn tf_engine(&self) -> TfEngine {
        let mut tf = TfEngine::new();
        for st in &self.static_transforms {
            tf.set_transform(&st.parent, &st.child, st.to_transform());
        }
        tf
    }
}

/// Tick period for a cycle rate of `rate_hz`.
///
/// # Errors
///
/// Returns [`FusionError::Config`] when the rate is not positive and finite,
/// exceeds 1 GHz, or implies a period longer than one day.
pub fn cycle_period(rate_hz: f64) -> Result<Duration, FusionError> {
    validate_positive("rate_hz", rate_hz)?;
    if rate_hz > MAX_RATE_HZ {
        return Err(FusionError::Config(format!(
            "rate_hz must be at most {MAX_RATE_HZ}, got {rate_hz}"
        )));
    }
    let period = bounded_duration("rate_hz period", 1.0 / rate_hz)?;
    if period.is_zero() {
        return Err(FusionError::Config(format!(
            "rate_hz {rate_hz} yields a zero period"
        )));
    }
    Ok(period)
}

fn bounded_duration(field: &str, secs: f64) -> Result<Duration, FusionError> {
    validate_positive(field, secs)?;
    if secs > MAX_WINDOW_SECS {
        return Err(FusionError::Config(format!(
            "{field} must be at most {MAX_WINDOW_SECS} s, got {secs}"
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| FusionError::Config(format!("{field} {secs} is not a valid duration: {e}")))
}

fn validate_frame_name(field: &str, name: &str) -> Result<(), FusionError> {
    if name.is_empty() {
        return Err(FusionError::Config(format!("{field} must not be empty")));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(FusionError::Config(format!(
            "{field} '{name}' must not contain whitespace"
        )));
    }
    if name.starts_with('/') {
        return Err(FusionError::Config(format!(
            "{field} '{name}' must not start with '/'"
        )));
    }
    Ok(())
}

fn validate_positive(field: &str, value: f64) -> Result<(), FusionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FusionError::Config(format!(
            "{field} must be a positive finite number, got {value}"
        )))
    }
}
