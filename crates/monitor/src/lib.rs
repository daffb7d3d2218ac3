//! Delay-escalation monitoring for scheduled bus departures.
//!
//! This crate provides:
//! - `classifier`: pure delay/severity classification on a time-of-day clock
//! - `debouncer`: cooldown gate for operator alerts
//! - `monitor`: periodic re-evaluation of tracked trips with escalation reporting

pub mod classifier;
pub mod debouncer;
pub mod error;
pub mod monitor;

pub use classifier::{classify, parse_departure, severity_for, Classification};
pub use debouncer::{AlertDebouncer, AlertRecord};
pub use error::{DepartureError, MonitorError};
pub use monitor::{DelayMonitor, Escalation, RaisedAlert, SyncSummary, TickReport};
