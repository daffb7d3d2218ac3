//! Cyclic rotation of the assignment queue.
//!
//! Each tick takes the head bus, commits it to the next slot through the
//! [`AssignmentSink`] and moves it to the tail. Over `N` ticks with no
//! manual reordering every queued bus is committed exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use fleetwatch_core::config::RotationConfig;
use fleetwatch_notify::{AssignmentSink, AssignmentSlot};
use tracing::{debug, info, warn};

use crate::assignment::AssignmentQueue;
use crate::error::RotationError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    Committed { bus_id: String, slot: AssignmentSlot },
    EmptyQueue,
    Disabled,
}

pub struct RotationScheduler {
    enabled: AtomicBool,
    period: Duration,
    slots: Vec<String>,
    sequence: u64,
    sink: Arc<dyn AssignmentSink>,
}

impl RotationScheduler {
    pub fn new(period: Duration, slots: Vec<String>, sink: Arc<dyn AssignmentSink>) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            period,
            slots,
            sequence: 0,
            sink,
        }
    }

    pub fn from_config(config: &RotationConfig, sink: Arc<dyn AssignmentSink>) -> Self {
        let scheduler = Self::new(config.period(), config.slots.clone(), sink);
        scheduler.set_enabled(config.enabled);
        scheduler
    }

    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            info!(enabled, "rotation toggled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Cadence as a chrono duration, for queue estimates.
    pub fn cadence(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.period).unwrap_or(chrono::Duration::zero())
    }

    /// Slots committed so far.
    pub fn committed(&self) -> u64 {
        self.sequence
    }

    /// Run one rotation step at `now`.
    ///
    /// If the sink rejects the commit the bus goes back to the head and the
    /// queue is exactly as it was before the call.
    pub fn fire(&mut self, queue: &mut AssignmentQueue, now: DateTime<Utc>) -> Result<RotationOutcome, RotationError> {
        if !self.is_enabled() {
            debug!("rotation tick skipped, rotation disabled");
            return Ok(RotationOutcome::Disabled);
        }
        let Some(head) = queue.advance() else {
            info!("rotation tick skipped, queue is empty");
            return Ok(RotationOutcome::EmptyQueue);
        };

        let slot = self.slot_for(self.sequence + 1, now);
        let bus = head.into_bus();
        if let Err(source) = self.sink.commit(&bus.bus_id, &slot) {
            let bus_id = bus.bus_id.clone();
            queue.restore_head(bus)?;
            warn!(
                bus_id = %bus_id,
                sink = self.sink.sink_name(),
                error = %source,
                "assignment commit failed, head restored"
            );
            return Err(RotationError::Commit { bus_id, source });
        }

        self.sequence = slot.sequence;
        let bus_id = bus.bus_id.clone();
        queue.enqueue(bus)?;
        if let Some(next) = now.checked_add_signed(self.cadence()) {
            queue.set_next_assignment(next, self.cadence());
        }

        info!(
            bus_id = %bus_id,
            slot = %slot.label,
            sequence = slot.sequence,
            queued = queue.len(),
            "bus committed to slot"
        );
        Ok(RotationOutcome::Committed { bus_id, slot })
    }

    fn slot_for(&self, sequence: u64, now: DateTime<Utc>) -> AssignmentSlot {
        let label = if self.slots.is_empty() {
            format!("slot-{sequence}")
        } else {
            let idx = ((sequence - 1) % self.slots.len() as u64) as usize;
            self.slots[idx].clone()
        };
        AssignmentSlot {
            sequence,
            label,
            starts_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use chrono::TimeZone;
    use fleetwatch_core::{IdleBus, OperatorType};
    use fleetwatch_notify::SinkError;

    use crate::error::QueueError;

    #[derive(Default)]
    struct RecordingSink {
        commits: Mutex<Vec<(String, AssignmentSlot)>>,
        fail: AtomicBool,
    }

    impl RecordingSink {
        fn commits(&self) -> Vec<(String, AssignmentSlot)> {
            self.commits.lock().unwrap().clone()
        }
    }

    impl AssignmentSink for RecordingSink {
        fn commit(&self, bus_id: &str, slot: &AssignmentSlot) -> Result<(), SinkError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SinkError::Rejected("depot offline".into()));
            }
            self.commits.lock().unwrap().push((bus_id.to_string(), slot.clone()));
            Ok(())
        }

        fn sink_name(&self) -> &str {
            "recording"
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 30, 0).unwrap()
    }

    fn queue_of(ids: &[&str]) -> AssignmentQueue {
        let mut q = AssignmentQueue::new();
        for id in ids {
            q.enqueue(IdleBus::new(*id, format!("NB-{id}"), OperatorType::Private, 40))
                .unwrap();
        }
        q
    }

    fn scheduler(slots: &[&str]) -> (RotationScheduler, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let s = RotationScheduler::new(
            Duration::from_secs(86_400),
            slots.iter().map(|s| s.to_string()).collect(),
            sink.clone(),
        );
        s.set_enabled(true);
        (s, sink)
    }

    #[test]
    fn full_cycle_commits_each_bus_once() {
        let (mut s, sink) = scheduler(&[]);
        let mut q = queue_of(&["A", "B", "C"]);

        let mut t = now();
        for expected in ["A", "B", "C"] {
            match s.fire(&mut q, t).unwrap() {
                RotationOutcome::Committed { bus_id, .. } => assert_eq!(bus_id, expected),
                other => panic!("unexpected outcome {other:?}"),
            }
            assert_eq!(q.len(), 3);
            t += chrono::Duration::days(1);
        }

        assert_eq!(q.order(), vec!["A", "B", "C"]);
        let commits = sink.commits();
        let ids: Vec<&str> = commits.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        let labels: Vec<&str> = commits.iter().map(|(_, slot)| slot.label.as_str()).collect();
        assert_eq!(labels, vec!["slot-1", "slot-2", "slot-3"]);
        assert_eq!(s.committed(), 3);
    }

    #[test]
    fn head_moves_to_tail() {
        let (mut s, _) = scheduler(&[]);
        let mut q = queue_of(&["A", "B", "C"]);
        s.fire(&mut q, now()).unwrap();
        assert_eq!(q.order(), vec!["B", "C", "A"]);
        assert_eq!(q.position_of("A"), Some(3));
        assert_eq!(
            q.peek_head().unwrap().estimated_assignment_time(),
            Some(now() + chrono::Duration::days(1))
        );
    }

    #[test]
    fn configured_slots_cycle() {
        let (mut s, sink) = scheduler(&["138-AM", "138-PM"]);
        let mut q = queue_of(&["A", "B", "C"]);
        for _ in 0..3 {
            s.fire(&mut q, now()).unwrap();
        }
        let labels: Vec<String> = sink.commits().into_iter().map(|(_, slot)| slot.label).collect();
        assert_eq!(labels, vec!["138-AM", "138-PM", "138-AM"]);
    }

    #[test]
    fn empty_queue_tick_is_noop() {
        let (mut s, sink) = scheduler(&[]);
        let mut q = AssignmentQueue::new();
        assert_eq!(s.fire(&mut q, now()).unwrap(), RotationOutcome::EmptyQueue);
        assert!(sink.commits().is_empty());
        assert_eq!(s.committed(), 0);
    }

    #[test]
    fn disabled_scheduler_does_nothing() {
        let (mut s, sink) = scheduler(&[]);
        s.set_enabled(false);
        let mut q = queue_of(&["A", "B"]);
        assert_eq!(s.fire(&mut q, now()).unwrap(), RotationOutcome::Disabled);
        assert_eq!(q.order(), vec!["A", "B"]);
        assert!(sink.commits().is_empty());
    }

    #[test]
    fn failed_commit_restores_queue() {
        let (mut s, sink) = scheduler(&[]);
        let mut q = queue_of(&["A", "B", "C"]);
        sink.fail.store(true, Ordering::SeqCst);

        let err = s.fire(&mut q, now()).unwrap_err();
        assert!(matches!(err, RotationError::Commit { ref bus_id, .. } if bus_id == "A"));
        assert_eq!(q.order(), vec!["A", "B", "C"]);
        assert_eq!(q.position_of("A"), Some(1));
        assert_eq!(s.committed(), 0);

        sink.fail.store(false, Ordering::SeqCst);
        match s.fire(&mut q, now()).unwrap() {
            RotationOutcome::Committed { bus_id, slot } => {
                assert_eq!(bus_id, "A");
                assert_eq!(slot.sequence, 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn single_bus_rotates_in_place() {
        let (mut s, _) = scheduler(&[]);
        let mut q = queue_of(&["A"]);
        s.fire(&mut q, now()).unwrap();
        s.fire(&mut q, now()).unwrap();
        assert_eq!(q.order(), vec!["A"]);
        assert_eq!(s.committed(), 2);
    }

    #[test]
    fn queue_errors_convert() {
        let err: RotationError = QueueError::NotFound("Z".into()).into();
        assert_eq!(err.to_string(), "bus Z is not queued");
    }

    #[test]
    fn from_config_respects_enabled_flag() {
        let sink = Arc::new(RecordingSink::default());
        let config = fleetwatch_core::Config::default().rotation;
        let s = RotationScheduler::from_config(&config, sink);
        assert_eq!(s.is_enabled(), config.enabled);
        assert_eq!(s.period(), config.period());
    }
}
