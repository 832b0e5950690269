//! `fidodom-perception` – the geometric fusion pipeline.
//!
//! Turns an intermittent fiducial-marker sighting into a world-frame pose and
//! a velocity estimate.
//!
//! # Modules
//!
//! - [`transform`] – [`TransformResolver`][transform::TransformResolver], the
//!   frame-lookup capability the pipeline consumes, and
//!   [`TfEngine`][transform::TfEngine], a graph of named reference frames
//!   that implements it.
//! - [`selector`] – [`DetectionSelector`][selector::DetectionSelector]: walks
//!   an ordered list of sensors and keeps the first one that saw a marker.
//! - [`compositor`] – [`PoseCompositor`][compositor::PoseCompositor]:
//!   re-expresses a camera-relative marker pose as a robot pose relative to
//!   the bin anchor in the odometry frame.
//! - [`velocity`] – [`VelocityEstimator`][velocity::VelocityEstimator] and
//!   [`FusionState`][velocity::FusionState]: differentiates consecutive
//!   accepted poses into a twist and builds the odometry record.

pub mod compositor;
pub mod selector;
pub mod transform;
pub mod velocity;

pub use compositor::{FrameIds, PoseCompositor};
pub use selector::{DetectionCapability, DetectionSelector};
pub use transform::{TfEngine, TransformResolver};
pub use velocity::{Estimate, FusionState, VelocityEstimator};
