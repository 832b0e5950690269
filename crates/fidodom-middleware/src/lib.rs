//! `fidodom-middleware` – routing between the fusion loop and its consumers.
//!
//! # Modules
//!
//! - [`bus`] – Headless, typed, topic-based publish/subscribe event bus built
//!   on Tokio broadcast channels.
//! - [`sink`] – The [`OdometrySink`] capability and its bus-backed
//!   implementation.

pub mod bus;
pub mod sink;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use sink::{BusOdometrySink, OdometrySink};
