//! Periodic re-evaluation of tracked trips.
//!
//! [`DelayMonitor`] owns the tracked trip set, the [`AlertDebouncer`] and the
//! notification sink. Each [`tick`](DelayMonitor::tick) classifies every
//! trip, commits the new delay state in one pass, reports upward severity
//! transitions and raises debounced alerts for trips that just became
//! critical.
//!
//! [`AlertDebouncer`]: crate::debouncer::AlertDebouncer

mod core;
mod report;


pub use self::core::DelayMonitor;
pub use self::report::{Escalation, RaisedAlert, SyncSummary, TickReport};
