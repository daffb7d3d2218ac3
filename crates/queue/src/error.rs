//! Queue and rotation error types.

use fleetwatch_notify::SinkError;
use thiserror::Error;

/// An operation that cannot be applied to the current queue. The queue is
/// left unchanged whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("bus {0} is not queued")]
    NotFound(String),

    #[error("bus {0} is already at the head of the queue")]
    AlreadyAtHead(String),

    #[error("bus {0} is already queued")]
    DuplicateBus(String),
}

#[derive(Debug, Error)]
pub enum RotationError {
    /// The assignment sink refused the commit; the bus was put back at the head.
    #[error("assignment commit failed for bus {bus_id}: {source}")]
    Commit { bus_id: String, source: SinkError },

    #[error(transparent)]
    Queue(#[from] QueueError),
}
