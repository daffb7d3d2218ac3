//! Result types produced by the monitor.

use chrono::{DateTime, Utc};
use fleetwatch_core::Severity;

use crate::error::MonitorError;

/// A trip that moved to a strictly higher severity tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub trip_id: String,
    pub from: Severity,
    pub to: Severity,
    pub delay_minutes: u32,
}

/// An alert that passed the debouncer and was handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaisedAlert {
    pub trip_id: String,
    pub severity: Severity,
    pub message: String,
    /// Whether the sink accepted it. Failed deliveries are not retried.
    pub delivered: bool,
}

/// Outcome of one monitor tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    /// Trips classified this cycle (excludes data errors).
    pub evaluated: usize,
    pub escalations: Vec<Escalation>,
    pub alerts: Vec<RaisedAlert>,
    /// Trips that became critical but were held back by the cooldown.
    pub suppressed: Vec<String>,
    pub data_errors: Vec<MonitorError>,
}

impl TickReport {
    pub(crate) fn new(at: DateTime<Utc>) -> Self {
        Self {
            at,
            evaluated: 0,
            escalations: Vec::new(),
            alerts: Vec::new(),
            suppressed: Vec::new(),
            data_errors: Vec::new(),
        }
    }

    /// True when nothing escalated, alerted or failed.
    pub fn is_quiet(&self) -> bool {
        self.escalations.is_empty() && self.alerts.is_empty() && self.data_errors.is_empty()
    }
}

/// Changes applied by [`DelayMonitor::sync_trips`](super::DelayMonitor::sync_trips).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}
