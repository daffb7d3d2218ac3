//! Notification and assignment sinks for fleet alerts.
//!
//! This crate provides:
//! - `NotificationSink` / `AssignmentSink` traits the core publishes into
//! - Log and broadcast-channel sink implementations
//! - Minijinja template rendering for alert messages
//! - Dispatcher that fans notifications out to several sinks

pub mod channel;
pub mod dispatcher;
pub mod events;
pub mod log_sink;
pub mod templating;
pub mod traits;

pub use channel::ChannelSink;
pub use dispatcher::SinkDispatcher;
pub use events::FleetEvent;
pub use log_sink::LogSink;
pub use templating::{AlertContext, AlertRenderer, DEFAULT_ALERT_TEMPLATE};
pub use traits::{AssignmentSink, AssignmentSlot, NotificationSink, SinkError};
