//! Fans alert notifications out to several sinks.
//!
//! Individual sink failures don't block the remaining sinks.

use std::sync::Arc;

use fleetwatch_core::Severity;

use crate::traits::{DispatchResult, NotificationSink, SinkError};

/// Dispatches notifications to every registered sink.
#[derive(Default)]
pub struct SinkDispatcher {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl SinkDispatcher {
    pub fn new(sinks: Vec<Arc<dyn NotificationSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver to all sinks and report per-sink outcomes.
    pub fn dispatch(&self, trip_id: &str, severity: Severity, message: &str) -> Vec<DispatchResult> {
        if self.sinks.is_empty() {
            tracing::debug!(trip_id, "No notification sinks configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(self.sinks.len());

        for sink in &self.sinks {
            let (success, error) = match sink.publish(trip_id, severity, message) {
                Ok(()) => {
                    tracing::debug!(trip_id, sink = sink.sink_name(), "Notification delivered");
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        trip_id,
                        sink = sink.sink_name(),
                        error = %e,
                        "Notification delivery failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                sink: sink.sink_name().to_string(),
                trip_id: trip_id.to_string(),
                success,
                error,
            });
        }

        results
    }
}

impl NotificationSink for SinkDispatcher {
    /// Succeeds when at least one sink accepted the notification.
    fn publish(&self, trip_id: &str, severity: Severity, message: &str) -> Result<(), SinkError> {
        let results = self.dispatch(trip_id, severity, message);
        if results.is_empty() || results.iter().any(|r| r.success) {
            Ok(())
        } else {
            Err(SinkError::Rejected(format!(
                "all {} sinks failed for trip {trip_id}",
                results.len()
            )))
        }
    }

    fn sink_name(&self) -> &str {
        "dispatcher"
    }
}
