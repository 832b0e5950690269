//! [`OdometrySink`] – where fused odometry records go.

use fidodom_types::{Event, EventPayload, OdometryRecord};
use tracing::{trace, warn};

use crate::bus::{EventBus, Topic};

/// Fire-and-forget consumer of odometry records.
pub trait OdometrySink: Send + Sync {
    fn publish(&self, record: &OdometryRecord);
}

/// Publishes each record as an [`EventPayload::Odometry`] event on
/// [`Topic::Odometry`].
#[derive(Clone, Debug)]
pub struct BusOdometrySink {
    bus: EventBus,
    source: String,
}

impl BusOdometrySink {
    pub fn new(bus: EventBus) -> Self {
        Self::with_source(bus, "fidodom-runtime::odometry")
    }

    /// Use `source` as the event envelope's source label.
    pub fn with_source(bus: EventBus, source: impl Into<String>) -> Self {
        Self {
            bus,
            source: source.into(),
        }
    }
}

impl OdometrySink for BusOdometrySink {
    fn publish(&self, record: &OdometryRecord) {
        let event = Event::new(self.source.clone(), EventPayload::Odometry(record.clone()));
        match self.bus.publish_to(Topic::Odometry, event) {
            Ok(receivers) => trace!(receivers, stamp = record.timestamp, "odometry published"),
            Err(e) => warn!(error = %e, "failed to publish odometry"),
        }
    }
}
