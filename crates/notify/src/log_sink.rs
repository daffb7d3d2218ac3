//! Tracing-backed sink, useful as a default and in the worker binary.

use fleetwatch_core::Severity;

use crate::traits::{AssignmentSink, AssignmentSlot, NotificationSink, SinkError};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn publish(&self, trip_id: &str, severity: Severity, message: &str) -> Result<(), SinkError> {
        tracing::warn!(trip_id, %severity, "{message}");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}

impl AssignmentSink for LogSink {
    fn commit(&self, bus_id: &str, slot: &AssignmentSlot) -> Result<(), SinkError> {
        tracing::info!(
            bus_id,
            slot = %slot.label,
            sequence = slot.sequence,
            starts_at = %slot.starts_at,
            "assignment committed"
        );
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}
