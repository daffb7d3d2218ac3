//! Broadcast-channel sink feeding the presentation layer.

use fleetwatch_core::Severity;
use tokio::sync::broadcast;

use crate::events::FleetEvent;
use crate::traits::{AssignmentSink, AssignmentSlot, NotificationSink, SinkError};

/// Publishes alerts and committed assignments as [`FleetEvent`]s.
///
/// Sending with no live subscribers is not an error: nobody is watching.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: broadcast::Sender<FleetEvent>,
}

impl ChannelSink {
    /// Create a sink with its own channel of the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: FleetEvent) {
        let kind = event.kind();
        if self.sender.send(event).is_err() {
            tracing::debug!(kind, "no subscribers for fleet event");
        }
    }
}

impl NotificationSink for ChannelSink {
    fn publish(&self, trip_id: &str, severity: Severity, message: &str) -> Result<(), SinkError> {
        self.emit(FleetEvent::AlertRaised {
            trip_id: trip_id.to_string(),
            severity,
            message: message.to_string(),
        });
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "channel"
    }
}

impl AssignmentSink for ChannelSink {
    fn commit(&self, bus_id: &str, slot: &AssignmentSlot) -> Result<(), SinkError> {
        self.emit(FleetEvent::AssignmentCommitted {
            bus_id: bus_id.to_string(),
            slot: slot.clone(),
        });
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "channel"
    }
}
