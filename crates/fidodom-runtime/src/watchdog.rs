//! [`OdometryWatchdog`] – detects sustained absence of odometry output.
//!
//! The cycle driver calls [`OdometryWatchdog::heartbeat`] whenever a record
//! is emitted and [`OdometryWatchdog::check`] after every cycle.  A silence
//! longer than the configured window is reported once; the next heartbeat
//! ends the episode.

use std::time::{Duration, Instant};

/// Freshness of the odometry output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OdometryHealth {
    /// A record was emitted within the staleness window.
    Fresh,
    /// No record has been emitted for longer than the window.
    Stale,
}

/// Tracks the time of the last emitted record.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use fidodom_runtime::watchdog::{OdometryHealth, OdometryWatchdog};
///
/// let mut wd = OdometryWatchdog::new(Duration::from_secs(5));
/// wd.heartbeat();
/// assert_eq!(wd.health(), OdometryHealth::Fresh);
/// ```
#[derive(Debug)]
pub struct OdometryWatchdog {
    stale_after: Duration,
    last_heartbeat: Instant,
    reported: bool,
}

impl OdometryWatchdog {
    /// The silence clock starts now.
    pub fn new(stale_after: Duration) -> Self {
        Self {
            stale_after,
            last_heartbeat: Instant::now(),
            reported: false,
        }
    }

    pub fn stale_after(&self) -> Duration {
        self.stale_after
    }

    /// Record an emission.  Returns `true` if this ends a stale episode.
    pub fn heartbeat(&mut self) -> bool {
        self.heartbeat_at(Instant::now())
    }

    pub fn heartbeat_at(&mut self, now: Instant) -> bool {
        self.last_heartbeat = now;
        std::mem::take(&mut self.reported)
    }

    pub fn health(&self) -> OdometryHealth {
        self.health_at(Instant::now())
    }

    pub fn health_at(&self, now: Instant) -> OdometryHealth {
        if now.saturating_duration_since(self.last_heartbeat) > self.stale_after {
            OdometryHealth::Stale
        } else {
            OdometryHealth::Fresh
        }
    }

    /// Returns the silence length the first time a stale episode is seen,
    /// `None` otherwise.
    pub fn check(&mut self) -> Option<Duration> {
        self.check_at(Instant::now())
    }

    pub fn check_at(&mut self, now: Instant) -> Option<Duration> {
        if self.reported || self.health_at(now) == OdometryHealth::Fresh {
            return None;
        }
        self.reported = true;
        Some(now.saturating_duration_since(self.last_heartbeat))
    }
}
