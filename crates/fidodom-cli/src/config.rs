//! Configuration file – reads `~/.fidodom/config.toml`.
//!
//! The top level of the file is a [`FusionConfig`]; a `[sim]` table tunes
//! the simulated sensor stack the binary drives.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use fidodom_runtime::FusionConfig;
use fidodom_types::FusionError;
use serde::{Deserialize, Serialize};

/// Parameters of the simulated robot and sensors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSettings {
    /// Bin position in the odometry frame.
    #[serde(default = "default_bin")]
    pub bin: [f64; 3],

    /// Robot position at the first frame.
    #[serde(default = "default_start")]
    pub start: [f64; 3],

    /// Constant robot velocity in m/s.
    #[serde(default = "default_velocity")]
    pub velocity: [f64; 3],

    /// Per-source marker visibility: seen on every n-th frame, `0` = never.
    #[serde(default = "default_visibility")]
    pub visible_one_in: HashMap<String, u64>,

    /// Per-source frame dropout: every n-th fetch fails.
    #[serde(default)]
    pub dropout_every: HashMap<String, u64>,
}

fn default_bin() -> [f64; 3] {
    [2.0, 0.0, 0.0]
}
fn default_start() -> [f64; 3] {
    [0.5, 0.0, 0.0]
}
fn default_velocity() -> [f64; 3] {
    [0.1, 0.0, 0.0]
}
fn default_visibility() -> HashMap<String, u64> {
    HashMap::from([("rear_cam".to_string(), 3)])
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            bin: default_bin(),
            start: default_start(),
            velocity: default_velocity(),
            visible_one_in: default_visibility(),
            dropout_every: HashMap::new(),
        }
    }
}

/// Everything read from the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub fusion: FusionConfig,

    #[serde(default)]
    pub sim: SimSettings,
}

/// Return the path to `~/.fidodom/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".fidodom").join("config.toml")
}

/// Load the config from `path`.  Returns `None` if the file does not exist.
pub fn load_from(path: &Path) -> Result<Option<Config>, FusionError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        FusionError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw).map_err(|e| {
        FusionError::Config(format!("failed to parse config at {}: {e}", path.display()))
    })?;
    Ok(Some(cfg))
}

/// Resolve the configuration for this run.
///
/// An explicit `path` must exist; the default location may be absent, in
/// which case the stock configuration is used.  Environment overrides are
/// applied on top either way.
pub fn resolve(path: Option<&Path>) -> Result<(Config, Option<PathBuf>), FusionError> {
    let (path, explicit) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (config_path(), false),
    };
    let (mut cfg, source) = match load_from(&path)? {
        Some(cfg) => (cfg, Some(path)),
        None if explicit => {
            return Err(FusionError::Config(format!(
                "config file {} does not exist",
                path.display()
            )));
        }
        None => (Config::default(), None),
    };
    apply_env_overrides(&mut cfg.fusion);
    Ok((cfg, source))
}

/// Apply `FIDODOM_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FIDODOM_RATE_HZ` | `rate_hz` |
/// | `FIDODOM_DEBUG` | `debug_logging` (`1`/`true`/`yes`/`on`) |
/// | `FIDODOM_SENSOR_ORDER` | `sensor_order` (comma separated) |
/// | `FIDODOM_CAMERA_FRAME` | `camera_frame` |
/// | `FIDODOM_FOOTPRINT_FRAME` | `footprint_frame` |
/// | `FIDODOM_BIN_FRAME` | `bin_frame` |
/// | `FIDODOM_ODOM_FRAME` | `odom_frame` |
///
/// Values that fail to parse are ignored.
pub fn apply_env_overrides(cfg: &mut FusionConfig) {
    apply_overrides_from(cfg, |key| std::env::var(key).ok());
}

pub(crate) fn apply_overrides_from(cfg: &mut FusionConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("FIDODOM_RATE_HZ")
        && let Ok(rate) = v.trim().parse::<f64>()
    {
        cfg.rate_hz = rate;
    }
    if let Some(v) = lookup("FIDODOM_DEBUG")
        && let Some(flag) = parse_flag(&v)
    {
        cfg.debug_logging = flag;
    }
    if let Some(v) = lookup("FIDODOM_SENSOR_ORDER") {
        cfg.sensor_order = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
    for (key, field) in [
        ("FIDODOM_CAMERA_FRAME", &mut cfg.camera_frame),
        ("FIDODOM_FOOTPRINT_FRAME", &mut cfg.footprint_frame),
        ("FIDODOM_BIN_FRAME", &mut cfg.bin_frame),
        ("FIDODOM_ODOM_FRAME", &mut cfg.odom_frame),
    ] {
        if let Some(v) = lookup(key) {
            *field = v;
        }
    }
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
