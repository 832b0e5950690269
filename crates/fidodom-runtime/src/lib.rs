//! `fidodom-runtime` – the fusion loop.
//!
//! # Modules
//!
//! - [`config`] – [`FusionConfig`][config::FusionConfig]: frame names,
//!   cycle rate, sensor fallback order, covariance constants and static
//!   transforms, with startup validation.
//! - [`cycle`] – [`CycleDriver`][cycle::CycleDriver]: one
//!   select → compose → estimate → publish pass per tick, owning the
//!   [`FusionState`][fidodom_perception::FusionState]; plus the fixed-rate
//!   [`run`][cycle::run] loop.
//! - [`watchdog`] – [`OdometryWatchdog`][watchdog::OdometryWatchdog]: flags
//!   sustained absence of odometry output once per episode.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.

pub mod config;
pub mod cycle;
pub mod telemetry;
pub mod watchdog;

pub use config::{FusionConfig, StaticTransform, cycle_period};
pub use cycle::{CycleDriver, CycleOutcome, CyclePhase, RunSummary, run};
pub use telemetry::{TracerProviderGuard, init_tracing};
pub use watchdog::{OdometryHealth, OdometryWatchdog};
