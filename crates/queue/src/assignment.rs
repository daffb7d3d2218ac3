//! Ordered queue of idle buses awaiting assignment.
//!
//! Every entry carries an explicit 1-based `queue_position`. Positions are
//! renumbered after each mutation so they always form the dense sequence
//! `1..=len` with no gaps or duplicates.

use chrono::{DateTime, Utc};
use fleetwatch_core::IdleBus;
use serde::Serialize;
use tracing::debug;

use crate::error::QueueError;

/// A queued bus and its rank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    #[serde(flatten)]
    bus: IdleBus,
    queue_position: usize,
    /// Display estimate only; rotation decides the real assignment time.
    /// `None` when no schedule is set or the estimate is out of range.
    estimated_assignment_time: Option<DateTime<Utc>>,
}

impl QueueEntry {
    pub fn bus(&self) -> &IdleBus {
        &self.bus
    }

    pub fn bus_id(&self) -> &str {
        &self.bus.bus_id
    }

    pub fn queue_position(&self) -> usize {
        self.queue_position
    }

    pub fn estimated_assignment_time(&self) -> Option<DateTime<Utc>> {
        self.estimated_assignment_time
    }

    pub fn into_bus(self) -> IdleBus {
        self.bus
    }
}

#[derive(Debug, Default)]
pub struct AssignmentQueue {
    entries: Vec<QueueEntry>,
    /// Next rotation instant and the cadence between rotations.
    schedule: Option<(DateTime<Utc>, chrono::Duration)>,
}

impl AssignmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a bus at the tail. Returns its position.
    pub fn enqueue(&mut self, bus: IdleBus) -> Result<usize, QueueError> {
        if self.contains(&bus.bus_id) {
            return Err(QueueError::DuplicateBus(bus.bus_id));
        }
        debug!(bus_id = %bus.bus_id, position = self.entries.len() + 1, "bus enqueued");
        self.entries.push(QueueEntry {
            bus,
            queue_position: 0,
            estimated_assignment_time: None,
        });
        self.renumber();
        Ok(self.entries.len())
    }

    /// Swap a bus with its immediate predecessor. Returns its new position.
    pub fn promote(&mut self, bus_id: &str) -> Result<usize, QueueError> {
        let idx = self.index_of(bus_id)?;
        if idx == 0 {
            return Err(QueueError::AlreadyAtHead(bus_id.to_string()));
        }
        self.entries.swap(idx - 1, idx);
        self.renumber();
        debug!(bus_id, position = idx, "bus promoted");
        Ok(idx)
    }

    /// Delete a bus and close the gap it leaves.
    pub fn remove(&mut self, bus_id: &str) -> Result<QueueEntry, QueueError> {
        let idx = self.index_of(bus_id)?;
        let mut removed = self.entries.remove(idx);
        self.renumber();
        removed.queue_position = 0;
        removed.estimated_assignment_time = None;
        debug!(bus_id, "bus removed from queue");
        Ok(removed)
    }

    pub fn peek_head(&self) -> Option<&QueueEntry> {
        self.entries.first()
    }

    /// Remove and return the head.
    pub fn advance(&mut self) -> Option<QueueEntry> {
        let head_id = self.entries.first()?.bus_id().to_string();
        self.remove(&head_id).ok()
    }

    /// Put a bus back at the head, e.g. to roll back a failed rotation.
    pub fn restore_head(&mut self, bus: IdleBus) -> Result<(), QueueError> {
        if self.contains(&bus.bus_id) {
            return Err(QueueError::DuplicateBus(bus.bus_id));
        }
        self.entries.insert(
            0,
            QueueEntry {
                bus,
                queue_position: 0,
                estimated_assignment_time: None,
            },
        );
        self.renumber();
        Ok(())
    }

    /// Enqueue idle buses from a catalog snapshot that are not queued yet.
    /// Returns how many were added.
    pub fn sync_idle(&mut self, buses: Vec<IdleBus>) -> usize {
        let mut added = 0;
        for bus in buses {
            if self.enqueue(bus).is_ok() {
                added += 1;
            }
        }
        added
    }

    /// Set the next rotation instant used to derive per-entry estimates.
    pub fn set_next_assignment(&mut self, at: DateTime<Utc>, cadence: chrono::Duration) {
        self.schedule = Some((at, cadence));
        self.renumber();
    }

    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// Bus ids in queue order.
    pub fn order(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.bus.bus_id.clone()).collect()
    }

    pub fn position_of(&self, bus_id: &str) -> Option<usize> {
        self.index_of(bus_id).ok().map(|idx| idx + 1)
    }

    pub fn contains(&self, bus_id: &str) -> bool {
        self.entries.iter().any(|e| e.bus.bus_id == bus_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn index_of(&self, bus_id: &str) -> Result<usize, QueueError> {
        self.entries
            .iter()
            .position(|e| e.bus.bus_id == bus_id)
            .ok_or_else(|| QueueError::NotFound(bus_id.to_string()))
    }

    fn renumber(&mut self) {
        let schedule = self.schedule;
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            entry.queue_position = idx + 1;
            entry.estimated_assignment_time = schedule.and_then(|(at, cadence)| {
                let offset = cadence.checked_mul(i32::try_from(idx).ok()?)?;
                at.checked_add_signed(offset)
            });
        }
    }
}
