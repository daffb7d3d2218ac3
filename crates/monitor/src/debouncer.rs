//! Cooldown gate for operator alerts.
//!
//! With [`DebounceScope::Global`] one last-notified instant is shared by every
//! trip, so a second trip turning critical inside the window is suppressed
//! too. [`DebounceScope::PerTrip`] keeps the window per trip. In both scopes a
//! trip whose severity strictly increased since its last notification bypasses
//! the window.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetwatch_core::config::{DebounceScope, MonitorConfig};
use fleetwatch_core::{Severity, SharedClock};
use tracing::debug;

/// Last notification sent for a trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub trip_id: String,
    pub last_severity_notified: Severity,
    pub last_notified_at: DateTime<Utc>,
}

pub struct AlertDebouncer {
    cooldown: chrono::Duration,
    scope: DebounceScope,
    records: HashMap<String, AlertRecord>,
    last_notified_at: Option<DateTime<Utc>>,
    clock: SharedClock,
}

impl AlertDebouncer {
    pub fn new(cooldown: Duration, scope: DebounceScope, clock: SharedClock) -> Self {
        Self {
            cooldown: chrono::Duration::from_std(cooldown).unwrap_or(chrono::Duration::zero()),
            scope,
            records: HashMap::new(),
            last_notified_at: None,
            clock,
        }
    }

    pub fn from_config(config: &MonitorConfig, clock: SharedClock) -> Self {
        Self::new(config.alert_cooldown(), config.debounce_scope, clock)
    }

    /// Gate a notification at the clock's current time.
    pub fn should_notify(&mut self, trip_id: &str, severity: Severity) -> bool {
        let now = self.clock.now();
        self.should_notify_at(trip_id, severity, now)
    }

    /// Gate a notification at an explicit instant.
    ///
    /// Returns `true` and records `now` when nothing was notified yet in scope,
    /// the cooldown has elapsed, or `severity` is strictly higher than the
    /// trip's last notified severity.
    pub fn should_notify_at(&mut self, trip_id: &str, severity: Severity, now: DateTime<Utc>) -> bool {
        let record = self.records.get(trip_id);
        let escalated = record.is_some_and(|r| severity > r.last_severity_notified);

        let last = match self.scope {
            DebounceScope::Global => self.last_notified_at,
            DebounceScope::PerTrip => record.map(|r| r.last_notified_at),
        };
        let cooled_down = last.map_or(true, |last| now.signed_duration_since(last) >= self.cooldown);

        if !cooled_down && !escalated {
            debug!(
                trip_id,
                %severity,
                scope = %self.scope,
                "alert suppressed by cooldown"
            );
            return false;
        }

        self.records.insert(
            trip_id.to_string(),
            AlertRecord {
                trip_id: trip_id.to_string(),
                last_severity_notified: severity,
                last_notified_at: now,
            },
        );
        self.last_notified_at = Some(self.last_notified_at.map_or(now, |prev| prev.max(now)));
        true
    }

    /// Drop a trip's record once it leaves the tracked set.
    pub fn forget(&mut self, trip_id: &str) -> Option<AlertRecord> {
        self.records.remove(trip_id)
    }

    pub fn record(&self, trip_id: &str) -> Option<&AlertRecord> {
        self.records.get(trip_id)
    }

    pub fn scope(&self) -> DebounceScope {
        self.scope
    }

    pub fn cooldown(&self) -> chrono::Duration {
        self.cooldown
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
