//! `fidodom-hal` – sensor-side capabilities of the fusion pipeline.
//!
//! # Modules
//!
//! - [`camera`] – [`FrameSource`][camera::FrameSource]: one image source per
//!   sensor id, returning a frame together with its calibration.
//! - [`detector`] – [`MarkerDetector`][detector::MarkerDetector]: turns a
//!   captured frame into a [`DetectionResult`][fidodom_types::DetectionResult].
//! - [`registry`] – [`SensorRegistry`][registry::SensorRegistry]: owns the
//!   frame sources and the shared detector and serves as the
//!   [`DetectionCapability`][fidodom_perception::DetectionCapability] the
//!   selector walks.
//! - [`sim`] – simulated camera and detector for headless runs and CI.

pub mod camera;
pub mod detector;
pub mod registry;
pub mod sim;

pub use camera::{CameraFrame, CameraInfo, CapturedFrame, FrameSource};
pub use detector::MarkerDetector;
pub use registry::SensorRegistry;
