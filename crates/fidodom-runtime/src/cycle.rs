//! [`CycleDriver`] – one fusion cycle per tick, and the fixed-rate [`run`]
//! loop around it.
//!
//! ```text
//!  ┌──────┐  tick   ┌────────┐  select → compose → estimate → publish
//!  │ Idle │ ──────▶ │ Fusing │ ─────────────────────────────────────────┐
//!  └──────┘         └────────┘                                          │
//!      ▲                         cycle end (emitted / nothing / error)  │
//!      └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A cycle ends in exactly one [`CycleOutcome`].  Only an emitted record
//! advances the [`FusionState`]; every other outcome leaves it untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fidodom_middleware::{EventBus, OdometrySink, Topic};
use fidodom_perception::{
    DetectionCapability, DetectionSelector, FusionState, PoseCompositor, TransformResolver,
    VelocityEstimator,
};
use fidodom_types::{Event, EventPayload, FusionError, OdometryRecord};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{FusionConfig, cycle_period};
use crate::watchdog::OdometryWatchdog;

const EVENT_SOURCE: &str = "fidodom-runtime::cycle";

/// Driver state between and during cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Fusing,
}

/// How a single cycle ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A record was handed to the sink and the state advanced.
    Emitted(OdometryRecord),
    /// No source saw a marker.
    NoDetection,
    /// A collaborator failed or the timestep was degenerate; nothing emitted.
    Abandoned(FusionError),
}

/// Owns the fusion pipeline and its cross-cycle state.
pub struct CycleDriver {
    selector: DetectionSelector,
    compositor: PoseCompositor,
    estimator: VelocityEstimator,
    detections: Box<dyn DetectionCapability>,
    resolver: Box<dyn TransformResolver>,
    sink: Box<dyn OdometrySink>,
    diagnostics: Option<EventBus>,
    watchdog: Option<OdometryWatchdog>,
    state: FusionState,
    phase: CyclePhase,
}

impl CycleDriver {
    /// Build a driver from a validated configuration and its collaborators.
    pub fn new(
        config: &FusionConfig,
        detections: Box<dyn DetectionCapability>,
        resolver: Box<dyn TransformResolver>,
        sink: Box<dyn OdometrySink>,
    ) -> Self {
        Self {
            selector: DetectionSelector::new(config.sensor_order.clone()),
            compositor: PoseCompositor::new(config.frame_ids()),
            estimator: VelocityEstimator::new(
                config.odom_frame.clone(),
                config.footprint_frame.clone(),
                config.pose_covariance,
                config.twist_covariance,
            ),
            detections,
            resolver,
            sink,
            diagnostics: None,
            watchdog: None,
            state: FusionState::new(),
            phase: CyclePhase::Idle,
        }
    }

    /// Publish cycle faults and staleness alerts on `bus`'s
    /// [`Topic::Diagnostics`].
    pub fn with_diagnostics(mut self, bus: EventBus) -> Self {
        self.diagnostics = Some(bus);
        self
    }

    pub fn with_watchdog(mut self, watchdog: OdometryWatchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    pub fn phase(&self) -> CyclePhase {
        self.phase
    }

    pub fn state(&self) -> &FusionState {
        &self.state
    }

    /// Run one fusion cycle.
    pub fn tick(&mut self) -> CycleOutcome {
        self.phase = CyclePhase::Fusing;
        let outcome = match self.fuse() {
            Ok(Some(record)) => CycleOutcome::Emitted(record),
            Ok(None) => CycleOutcome::NoDetection,
            Err(e) => CycleOutcome::Abandoned(e),
        };
        self.phase = CyclePhase::Idle;

        match &outcome {
            CycleOutcome::Emitted(record) => {
                debug!(
                    stamp = record.timestamp,
                    x = record.pose.position.x, y = record.pose.position.y, z = record.pose.position.z,
                    vx = record.twist_linear.x, vy = record.twist_linear.y, vz = record.twist_linear.z,
                    "odometry emitted"
                );
                if let Some(wd) = self.watchdog.as_mut()
                    && wd.heartbeat()
                {
                    info!("odometry output resumed");
                }
            }
            CycleOutcome::NoDetection => debug!("no marker visible on any source"),
            CycleOutcome::Abandoned(e) => {
                warn!(kind = e.kind(), error = %e, "fusion cycle abandoned");
                self.publish_diagnostic(EventPayload::CycleFault(e.clone()));
            }
        }

        if let Some(silent) = self.watchdog.as_mut().and_then(|wd| wd.check()) {
            let silent_secs = silent.as_secs_f64();
            warn!(silent_secs, "no odometry emitted within the staleness window");
            self.publish_diagnostic(EventPayload::OdometryStale { silent_secs });
        }

        outcome
    }

    fn fuse(&mut self) -> Result<Option<OdometryRecord>, FusionError> {
        let Some(detection) = self.selector.select(self.detections.as_mut())? else {
            return Ok(None);
        };
        let pose = self.compositor.compose(&detection, self.resolver.as_ref())?;
        let estimate = self.estimator.estimate(&self.state, pose)?;

        self.sink.publish(&estimate.record);
        self.state = estimate.next_state;
        Ok(Some(estimate.record))
    }

    fn publish_diagnostic(&self, payload: EventPayload) {
        if let Some(bus) = &self.diagnostics
            && let Err(e) = bus.publish_to(Topic::Diagnostics, Event::new(EVENT_SOURCE, payload))
        {
            warn!(error = %e, "failed to publish diagnostic event");
        }
    }
}

/// Counters accumulated by [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub emitted: u64,
    pub no_detection: u64,
    pub abandoned: u64,
}

impl RunSummary {
    fn record(&mut self, outcome: &CycleOutcome) {
        self.ticks += 1;
        match outcome {
            CycleOutcome::Emitted(_) => self.emitted += 1,
            CycleOutcome::NoDetection => self.no_detection += 1,
            CycleOutcome::Abandoned(_) => self.abandoned += 1,
        }
    }
}

/// Drive `driver` at `rate_hz` until `shutdown` is raised or `max_ticks`
/// cycles have run.
///
/// Cycles that overrun their period delay the next tick instead of
/// triggering a burst of catch-up ticks.
///
/// # Errors
///
/// Returns [`FusionError::Config`] if `rate_hz` does not yield a usable
/// tick period (see [`cycle_period`]).
pub async fn run(
    driver: &mut CycleDriver,
    rate_hz: f64,
    shutdown: Arc<AtomicBool>,
    max_ticks: Option<u64>,
) -> Result<RunSummary, FusionError> {
    let period = cycle_period(rate_hz)?;
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(rate_hz, ?max_ticks, "fusion loop started");

    let mut summary = RunSummary::default();
    loop {
        if max_ticks.is_some_and(|max| summary.ticks >= max) {
            break;
        }
        interval.tick().await;
        if shutdown.load(Ordering::SeqCst) {
            break;
        }
        let outcome = driver.tick();
        summary.record(&outcome);
    }

    info!(
        ticks = summary.ticks,
        emitted = summary.emitted,
        no_detection = summary.no_detection,
        abandoned = summary.abandoned,
        "fusion loop stopped"
    );
    Ok(summary)
}
