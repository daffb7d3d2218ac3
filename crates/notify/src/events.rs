//! Events pushed to the presentation layer.

use fleetwatch_core::Severity;
use serde::Serialize;

use crate::traits::AssignmentSlot;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FleetEvent {
    /// A trip moved to a strictly higher severity tier.
    TripEscalated {
        trip_id: String,
        from: Severity,
        to: Severity,
        delay_minutes: u32,
    },
    /// An operator alert passed the debouncer.
    AlertRaised {
        trip_id: String,
        severity: Severity,
        message: String,
    },
    /// A trip was skipped this cycle because its schedule could not be read.
    DataError { trip_id: String, reason: String },
    AssignmentCommitted { bus_id: String, slot: AssignmentSlot },
    /// A rotation tick fired without committing anything.
    RotationSkipped { reason: String },
    /// Bus ids in queue order after a mutation.
    QueueChanged { order: Vec<String> },
}

impl FleetEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FleetEvent::TripEscalated { .. } => "trip_escalated",
            FleetEvent::AlertRaised { .. } => "alert_raised",
            FleetEvent::DataError { .. } => "data_error",
            FleetEvent::AssignmentCommitted { .. } => "assignment_committed",
            FleetEvent::RotationSkipped { .. } => "rotation_skipped",
            FleetEvent::QueueChanged { .. } => "queue_changed",
        }
    }
}
