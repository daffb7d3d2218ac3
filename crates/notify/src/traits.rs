//! Sink trait definitions and shared error types.

use chrono::{DateTime, Utc};
use fleetwatch_core::Severity;
use serde::{Deserialize, Serialize};

/// Errors that can occur while handing data to a sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Template rendering failed: {0}")]
    Template(String),

    #[error("Sink rejected: {0}")]
    Rejected(String),
}

/// Receives operator alerts. Delivery is fire-and-forget: the caller logs a
/// failure and moves on, it never retries.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, trip_id: &str, severity: Severity, message: &str) -> Result<(), SinkError>;

    /// Human-readable name for this sink (e.g., "log", "channel").
    fn sink_name(&self) -> &str;
}

/// The slot a bus is committed to by a rotation tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSlot {
    /// Monotonic counter of slots handed out by one scheduler.
    pub sequence: u64,
    /// Route or slot label.
    pub label: String,
    pub starts_at: DateTime<Utc>,
}

/// External scheduling collaborator that records committed assignments.
pub trait AssignmentSink: Send + Sync {
    fn commit(&self, bus_id: &str, slot: &AssignmentSlot) -> Result<(), SinkError>;

    fn sink_name(&self) -> &str;
}

/// Result of dispatching a notification to a single sink.
#[derive(Debug)]
pub struct DispatchResult {
    pub sink: String,
    pub trip_id: String,
    pub success: bool,
    pub error: Option<String>,
}
