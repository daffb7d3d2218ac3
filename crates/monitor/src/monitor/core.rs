//! [`DelayMonitor`]: tracks trips and drives classification and alerting.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};
use fleetwatch_core::clock::time_of_day;
use fleetwatch_core::config::MonitorConfig;
use fleetwatch_core::{Severity, SharedClock, Trip};
use fleetwatch_notify::{AlertContext, AlertRenderer, NotificationSink};
use indexmap::IndexMap;
use tracing::{debug, info, warn};

use crate::classifier::{classify, parse_departure, Classification};
use crate::debouncer::AlertDebouncer;
use crate::error::MonitorError;

use super::report::{Escalation, RaisedAlert, SyncSummary, TickReport};

/// Re-evaluates tracked trips and raises debounced alerts.
///
/// Call [`sync_trips`](DelayMonitor::sync_trips) with each fresh catalog
/// snapshot and [`tick`](DelayMonitor::tick) once per evaluation period.
pub struct DelayMonitor {
    trips: IndexMap<String, Trip>,
    debouncer: AlertDebouncer,
    sink: Arc<dyn NotificationSink>,
    renderer: AlertRenderer,
    offset: FixedOffset,
    clock: SharedClock,
}

impl DelayMonitor {
    pub fn new(config: &MonitorConfig, clock: SharedClock, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            trips: IndexMap::new(),
            debouncer: AlertDebouncer::from_config(config, clock.clone()),
            sink,
            renderer: AlertRenderer::or_default(config.alert_template.as_deref()),
            offset: config.offset(),
            clock,
        }
    }

    /// Assemble a monitor from explicit parts.
    pub fn from_parts(
        debouncer: AlertDebouncer,
        sink: Arc<dyn NotificationSink>,
        renderer: AlertRenderer,
        offset: FixedOffset,
        clock: SharedClock,
    ) -> Self {
        Self {
            trips: IndexMap::new(),
            debouncer,
            sink,
            renderer,
            offset,
            clock,
        }
    }

    /// Reconcile the tracked set with a catalog snapshot.
    ///
    /// - Adds trips not yet tracked.
    /// - Refreshes schedule fields of known trips (preserves delay state).
    /// - Drops trips no longer listed and clears their alert records.
    pub fn sync_trips(&mut self, trips: Vec<Trip>) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let incoming: std::collections::HashSet<String> =
            trips.iter().map(|t| t.id.clone()).collect();

        let before = self.trips.len();
        let debouncer = &mut self.debouncer;
        self.trips.retain(|id, _| {
            let keep = incoming.contains(id);
            if !keep {
                debouncer.forget(id);
                debug!(trip_id = %id, "trip left tracked set");
            }
            keep
        });
        summary.removed = before - self.trips.len();

        for trip in trips {
            match self.trips.get_mut(&trip.id) {
                Some(existing) => {
                    if refresh_schedule(existing, trip) {
                        summary.updated += 1;
                    }
                }
                None => {
                    self.trips.insert(trip.id.clone(), fresh(trip));
                    summary.added += 1;
                }
            }
        }

        if summary != SyncSummary::default() {
            info!(
                added = summary.added,
                updated = summary.updated,
                removed = summary.removed,
                tracked = self.trips.len(),
                "tracked trips synced"
            );
        }
        summary
    }

    /// Start tracking a single trip. Returns `false` if it was already tracked.
    pub fn track(&mut self, trip: Trip) -> bool {
        if self.trips.contains_key(&trip.id) {
            return false;
        }
        self.trips.insert(trip.id.clone(), fresh(trip));
        true
    }

    /// Stop tracking a trip (departed or cancelled).
    pub fn untrack(&mut self, trip_id: &str) -> Option<Trip> {
        self.debouncer.forget(trip_id);
        self.trips.shift_remove(trip_id)
    }

    /// Evaluate all trips at the clock's current time.
    pub fn tick_now(&mut self) -> TickReport {
        let now = self.clock.now();
        self.tick(now)
    }

    /// Evaluate all tracked trips at `now`.
    ///
    /// Classification runs over every trip before any state is written, so a
    /// tick is applied as a whole. Trips with a missing or unparsable departure
    /// are skipped and listed in [`TickReport::data_errors`].
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickReport {
        let local_now = time_of_day(now, self.offset);
        let mut report = TickReport::new(now);

        let mut staged: Vec<(String, Classification)> = Vec::with_capacity(self.trips.len());
        for trip in self.trips.values() {
            match parse_departure(trip.scheduled_departure.as_deref()) {
                Ok(scheduled) => staged.push((trip.id.clone(), classify(scheduled, local_now))),
                Err(source) => {
                    warn!(trip_id = %trip.id, error = %source, "trip excluded from evaluation");
                    report.data_errors.push(MonitorError::Data {
                        trip_id: trip.id.clone(),
                        source,
                    });
                }
            }
        }
        report.evaluated = staged.len();

        for (trip_id, classification) in staged {
            let Some(trip) = self.trips.get_mut(&trip_id) else {
                continue;
            };
            let previous = trip.severity;
            trip.current_delay_minutes = classification.delay_minutes;
            trip.severity = classification.severity;

            if classification.severity > previous {
                debug!(
                    trip_id = %trip_id,
                    from = %previous,
                    to = %classification.severity,
                    delay = classification.delay_minutes,
                    "trip escalated"
                );
                report.escalations.push(Escalation {
                    trip_id,
                    from: previous,
                    to: classification.severity,
                    delay_minutes: classification.delay_minutes,
                });
            } else if classification.severity < previous {
                debug!(trip_id = %trip_id, from = %previous, to = %classification.severity, "trip de-escalated");
            }
        }

        let newly_critical: Vec<String> = report
            .escalations
            .iter()
            .filter(|e| e.to == Severity::Critical)
            .map(|e| e.trip_id.clone())
            .collect();

        for trip_id in newly_critical {
            let Some(trip) = self.trips.get(&trip_id) else {
                continue;
            };
            if !self.debouncer.should_notify_at(&trip_id, Severity::Critical, now) {
                report.suppressed.push(trip_id);
                continue;
            }

            let message = render_message(&self.renderer, trip, now, self.offset);
            let delivered = match self.sink.publish(&trip_id, Severity::Critical, &message) {
                Ok(()) => true,
                Err(e) => {
                    warn!(trip_id = %trip_id, sink = self.sink.sink_name(), error = %e, "alert delivery failed");
                    false
                }
            };
            report.alerts.push(RaisedAlert {
                trip_id,
                severity: Severity::Critical,
                message,
                delivered,
            });
        }

        debug!(
            evaluated = report.evaluated,
            escalations = report.escalations.len(),
            alerts = report.alerts.len(),
            data_errors = report.data_errors.len(),
            "monitor tick complete"
        );
        report
    }

    pub fn trips(&self) -> impl Iterator<Item = &Trip> {
        self.trips.values()
    }

    pub fn trip(&self, trip_id: &str) -> Option<&Trip> {
        self.trips.get(trip_id)
    }

    /// Trips that are not on time, most severe and most delayed first.
    pub fn alerts(&self) -> Vec<&Trip> {
        let mut late: Vec<&Trip> = self
            .trips
            .values()
            .filter(|t| t.severity > Severity::OnTime)
            .collect();
        late.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then(b.current_delay_minutes.cmp(&a.current_delay_minutes))
        });
        late
    }

    pub fn debouncer(&self) -> &AlertDebouncer {
        &self.debouncer
    }

    pub fn len(&self) -> usize {
        self.trips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trips.is_empty()
    }
}

/// New trips start from a clean delay state regardless of what the catalog sent.
fn fresh(mut trip: Trip) -> Trip {
    trip.current_delay_minutes = 0;
    trip.severity = Severity::OnTime;
    trip
}

/// Copy schedule fields from `incoming`. Returns whether anything changed.
fn refresh_schedule(existing: &mut Trip, incoming: Trip) -> bool {
    let changed = existing.bus_id != incoming.bus_id
        || existing.route != incoming.route
        || existing.scheduled_departure != incoming.scheduled_departure
        || existing.last_known_location != incoming.last_known_location
        || existing.priority != incoming.priority;

    if changed {
        existing.bus_id = incoming.bus_id;
        existing.route = incoming.route;
        existing.scheduled_departure = incoming.scheduled_departure;
        existing.last_known_location = incoming.last_known_location;
        existing.priority = incoming.priority;
    }
    changed
}

fn render_message(renderer: &AlertRenderer, trip: &Trip, now: DateTime<Utc>, offset: FixedOffset) -> String {
    let ctx = AlertContext {
        trip_id: trip.id.clone(),
        bus_id: trip.bus_id.clone(),
        route: trip.route.clone(),
        severity: trip.severity.to_string(),
        delay_minutes: trip.current_delay_minutes,
        scheduled_departure: trip.scheduled_departure.clone().unwrap_or_default(),
        last_known_location: trip.last_known_location.clone(),
        now: now.with_timezone(&offset).to_rfc3339(),
    };
    renderer.render(&ctx).unwrap_or_else(|e| {
        warn!(trip_id = %trip.id, error = %e, "alert template failed, using plain message");
        format!(
            "Trip {} is {} min late ({})",
            trip.id, trip.current_delay_minutes, trip.severity
        )
    })
}
