use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use fleetwatch_core::{
    CatalogSnapshot, Config, IdleBus, ManualClock, OperatorType, Severity, SnapshotCatalog, Trip,
};
use fleetwatch_notify::{AssignmentSink, AssignmentSlot, FleetEvent, NotificationSink, SinkError};
use fleetwatch_queue::{QueueError, RotationOutcome};
use fleetwatch_runtime::{FleetHandle, FleetRuntime};
use tokio::sync::broadcast;

// ── Fixtures ────────────────────────────────────────────────────────

/// 2024-03-01 at the given UTC time. Depot clocks run at +05:30, so
/// `utc(2, 30)` is 08:00 local.
fn utc(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, 0).unwrap()
}

fn config(pairs: &[(&str, &str)]) -> Config {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    Config::from_lookup("", &move |key: &str| map.get(key).cloned())
}

fn bus(id: &str) -> IdleBus {
    IdleBus::new(id, format!("NB-{id}"), OperatorType::Sltb, 54)
}

fn catalog(trips: Vec<Trip>, buses: &[&str]) -> Arc<SnapshotCatalog> {
    Arc::new(SnapshotCatalog::new(CatalogSnapshot {
        trips,
        idle_buses: buses.iter().map(|id| bus(id)).collect(),
    }))
}

#[derive(Default)]
struct CountingSink {
    count: Arc<AtomicUsize>,
}

impl NotificationSink for CountingSink {
    fn publish(&self, _trip_id: &str, _severity: Severity, _message: &str) -> Result<(), SinkError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "counting"
    }
}

#[derive(Default)]
struct RecordingAssignments {
    commits: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingAssignments {
    fn committed(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }
}

impl AssignmentSink for RecordingAssignments {
    fn commit(&self, bus_id: &str, _slot: &AssignmentSlot) -> Result<(), SinkError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkError::Rejected("scheduler unavailable".into()));
        }
        self.commits.lock().unwrap().push(bus_id.to_string());
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "recording"
    }
}

struct Fixture {
    handle: FleetHandle,
    events: broadcast::Receiver<FleetEvent>,
    clock: Arc<ManualClock>,
    alerts: Arc<AtomicUsize>,
    assignments: Arc<RecordingAssignments>,
}

fn start(config: Config, catalog: Arc<SnapshotCatalog>, now: DateTime<Utc>) -> Fixture {
    let clock = Arc::new(ManualClock::new(now));
    let alerts = CountingSink::default();
    let alert_count = alerts.count.clone();
    let assignments = Arc::new(RecordingAssignments::default());

    let handle = FleetRuntime::new(config)
        .with_clock(clock.clone())
        .spawn(catalog, Arc::new(alerts), assignments.clone());
    let events = handle.subscribe();

    Fixture {
        handle,
        events,
        clock,
        alerts: alert_count,
        assignments,
    }
}

/// Receive events until one matches `pred`. Paused time auto-advances, so
/// periodic ticks fire as soon as the test is waiting.
async fn wait_for(
    rx: &mut broadcast::Receiver<FleetEvent>,
    pred: impl Fn(&FleetEvent) -> bool,
) -> (FleetEvent, Vec<FleetEvent>) {
    let mut seen = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(7 * 86_400), rx.recv())
            .await
            .expect("timed out waiting for fleet event")
            .expect("event channel closed");
        if pred(&event) {
            return (event, seen);
        }
        seen.push(event);
    }
}

// ── Monitor task ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn first_monitor_pass_escalates_and_alerts() {
    let cat = catalog(vec![Trip::new("T1", "B1", "138", "08:00")], &[]);
    let mut fx = start(config(&[]), cat, utc(3, 15));

    let (event, seen) = wait_for(&mut fx.events, |e| matches!(e, FleetEvent::TripEscalated { .. })).await;
    assert_eq!(
        event,
        FleetEvent::TripEscalated {
            trip_id: "T1".to_string(),
            from: Severity::OnTime,
            to: Severity::Critical,
            delay_minutes: 45,
        }
    );
    assert!(seen
        .iter()
        .any(|e| matches!(e, FleetEvent::AlertRaised { trip_id, .. } if trip_id == "T1")));
    assert_eq!(fx.alerts.load(Ordering::SeqCst), 1);

    let alerts = fx.handle.alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].severity, Severity::Critical);

    fx.handle.stop().await;
}

struct RejectingSink;

impl NotificationSink for RejectingSink {
    fn publish(&self, _trip_id: &str, _severity: Severity, _message: &str) -> Result<(), SinkError> {
        Err(SinkError::Rejected("pager offline".into()))
    }

    fn sink_name(&self) -> &str {
        "rejecting"
    }
}

#[tokio::test(start_paused = true)]
async fn rejected_alert_is_undelivered_but_still_broadcast() {
    let cat = catalog(vec![Trip::new("T1", "B1", "138", "08:00")], &[]);
    // 08:25 local: very late, no alert yet.
    let clock = Arc::new(ManualClock::new(utc(2, 55)));
    let handle = FleetRuntime::new(config(&[]))
        .with_clock(clock.clone())
        .spawn(cat, Arc::new(RejectingSink), Arc::new(RecordingAssignments::default()));
    let mut events = handle.subscribe();
    wait_for(&mut events, |e| matches!(e, FleetEvent::TripEscalated { .. })).await;

    // 08:45 local.
    clock.set(utc(3, 15));
    let report = handle.tick_monitor().await;
    assert_eq!(report.alerts.len(), 1);
    assert!(!report.alerts[0].delivered);

    let (event, _) = wait_for(&mut events, |e| matches!(e, FleetEvent::AlertRaised { .. })).await;
    assert!(matches!(
        event,
        FleetEvent::AlertRaised { ref trip_id, severity: Severity::Critical, .. } if trip_id == "T1"
    ));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn escalation_scenario_notifies_once() {
    let cat = catalog(vec![Trip::new("T1", "B1", "138", "08:00")], &[]);
    // 08:25 local.
    let mut fx = start(config(&[]), cat, utc(2, 55));

    let (event, _) = wait_for(&mut fx.events, |e| matches!(e, FleetEvent::TripEscalated { .. })).await;
    assert!(matches!(event, FleetEvent::TripEscalated { to: Severity::VeryLate, delay_minutes: 25, .. }));
    assert_eq!(fx.alerts.load(Ordering::SeqCst), 0);

    // 08:45 local.
    fx.clock.set(utc(3, 15));
    let report = fx.handle.tick_monitor().await;
    assert_eq!(report.alerts.len(), 1);
    assert_eq!(report.escalations[0].to, Severity::Critical);
    assert_eq!(fx.handle.trip("T1").await.unwrap().current_delay_minutes, 45);

    // Further periodic passes at the same severity stay silent.
    tokio::time::sleep(Duration::from_secs(180)).await;
    assert_eq!(fx.alerts.load(Ordering::SeqCst), 1);

    fx.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn bad_departure_is_broadcast_as_data_error() {
    let mut broken = Trip::new("T9", "B9", "177", "");
    broken.scheduled_departure = Some("later".to_string());
    let cat = catalog(vec![broken, Trip::new("T1", "B1", "138", "08:00")], &[]);
    let mut fx = start(config(&[]), cat, utc(2, 35));

    let (event, _) = wait_for(&mut fx.events, |e| matches!(e, FleetEvent::DataError { .. })).await;
    match event {
        FleetEvent::DataError { trip_id, reason } => {
            assert_eq!(trip_id, "T9");
            assert!(reason.contains("later"));
        }
        other => panic!("unexpected event {other:?}"),
    }
    // The healthy trip is still tracked and evaluated.
    assert_eq!(fx.handle.trips().await.len(), 2);
    assert_eq!(fx.handle.trip("T1").await.unwrap().current_delay_minutes, 5);

    fx.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn departed_trips_leave_the_tracked_set() {
    let cat = catalog(vec![Trip::new("T1", "B1", "138", "08:00")], &[]);
    let fx = start(config(&[]), cat.clone(), utc(2, 40));

    fx.handle.tick_monitor().await;
    assert_eq!(fx.handle.trips().await.len(), 1);

    cat.replace(CatalogSnapshot::default());
    fx.handle.tick_monitor().await;
    assert!(fx.handle.trips().await.is_empty());

    fx.handle.stop().await;
}

// ── Rotation task ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn rotation_task_cycles_through_queue() {
    let cfg = config(&[("FLEET_ROTATION_ENABLED", "true"), ("FLEET_ROTATION_PERIOD", "1h")]);
    let mut fx = start(cfg, catalog(vec![], &["A", "B", "C"]), utc(0, 0));

    let mut committed = Vec::new();
    for _ in 0..3 {
        let (event, _) =
            wait_for(&mut fx.events, |e| matches!(e, FleetEvent::AssignmentCommitted { .. })).await;
        if let FleetEvent::AssignmentCommitted { bus_id, slot } = event {
            committed.push((bus_id, slot.sequence));
        }
        assert_eq!(fx.handle.queue().await.len(), 3);
    }

    assert_eq!(
        committed,
        vec![("A".to_string(), 1), ("B".to_string(), 2), ("C".to_string(), 3)]
    );
    assert_eq!(fx.assignments.committed(), vec!["A", "B", "C"]);
    let order: Vec<String> = fx
        .handle
        .queue()
        .await
        .iter()
        .map(|e| e.bus_id().to_string())
        .collect();
    assert_eq!(order, vec!["A", "B", "C"]);

    fx.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn rotation_toggle_controls_firing() {
    let fx = start(config(&[]), catalog(vec![], &["A", "B"]), utc(0, 0));

    assert!(!fx.handle.rotation_enabled().await);
    assert_eq!(fx.handle.fire_rotation().await.unwrap(), RotationOutcome::Disabled);

    fx.handle.set_rotation_enabled(true).await;
    match fx.handle.fire_rotation().await.unwrap() {
        RotationOutcome::Committed { bus_id, .. } => assert_eq!(bus_id, "A"),
        other => panic!("unexpected outcome {other:?}"),
    }

    fx.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn empty_queue_rotation_is_skipped() {
    let cfg = config(&[("FLEET_ROTATION_ENABLED", "true")]);
    let mut fx = start(cfg, catalog(vec![], &[]), utc(0, 0));

    assert_eq!(fx.handle.fire_rotation().await.unwrap(), RotationOutcome::EmptyQueue);
    let (event, _) = wait_for(&mut fx.events, |e| matches!(e, FleetEvent::RotationSkipped { .. })).await;
    assert_eq!(
        event,
        FleetEvent::RotationSkipped {
            reason: "queue is empty".to_string()
        }
    );

    fx.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn failed_commit_leaves_queue_untouched() {
    let cfg = config(&[("FLEET_ROTATION_ENABLED", "true")]);
    let fx = start(cfg, catalog(vec![], &["A", "B", "C"]), utc(0, 0));
    fx.assignments.fail.store(true, Ordering::SeqCst);

    assert!(fx.handle.fire_rotation().await.is_err());
    let order: Vec<String> = fx
        .handle
        .queue()
        .await
        .iter()
        .map(|e| e.bus_id().to_string())
        .collect();
    assert_eq!(order, vec!["A", "B", "C"]);
    assert!(fx.assignments.committed().is_empty());

    fx.handle.stop().await;
}

// ── Operator commands ───────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn promote_and_remove_broadcast_queue_order() {
    let mut fx = start(config(&[]), catalog(vec![], &["A", "B", "C"]), utc(0, 0));

    assert_eq!(fx.handle.promote("C").await.unwrap(), 2);
    let (event, _) = wait_for(&mut fx.events, |e| matches!(e, FleetEvent::QueueChanged { .. })).await;
    assert_eq!(
        event,
        FleetEvent::QueueChanged {
            order: vec!["A".into(), "C".into(), "B".into()]
        }
    );

    let removed = fx.handle.remove("A").await.unwrap();
    assert_eq!(removed.bus_id(), "A");
    let queue = fx.handle.queue().await;
    let view: Vec<(String, usize)> = queue
        .iter()
        .map(|e| (e.bus_id().to_string(), e.queue_position()))
        .collect();
    assert_eq!(view, vec![("C".to_string(), 1), ("B".to_string(), 2)]);

    assert_eq!(
        fx.handle.promote("C").await,
        Err(QueueError::AlreadyAtHead("C".to_string()))
    );
    assert!(matches!(fx.handle.remove("A").await, Err(QueueError::NotFound(_))));

    fx.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn catalog_reload_enqueues_new_idle_buses() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.json");
    std::fs::write(
        &path,
        r#"{"trips": [], "idleBuses": [
            {"busId": "A", "registration": "NB-1", "operatorType": "SLTB", "capacity": 54}
        ]}"#,
    )
    .unwrap();

    let cat = Arc::new(SnapshotCatalog::new(CatalogSnapshot::from_file(&path).unwrap()));
    let fx = start(config(&[]), cat.clone(), utc(0, 0));
    assert_eq!(fx.handle.queue().await.len(), 1);

    std::fs::write(
        &path,
        r#"{"idleBuses": [
            {"busId": "A", "registration": "NB-1", "operatorType": "SLTB", "capacity": 54},
            {"busId": "D", "registration": "WP-9", "operatorType": "Private", "capacity": 40}
        ]}"#,
    )
    .unwrap();
    cat.reload_from(&path).unwrap();

    assert_eq!(fx.handle.sync_idle_buses().await, 1);
    let queue = fx.handle.queue().await;
    assert_eq!(queue[1].bus_id(), "D");
    assert_eq!(queue[1].queue_position(), 2);

    fx.handle.stop().await;
}

// ── Lifecycle ───────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_halts_ticks() {
    let cat = catalog(vec![Trip::new("T1", "B1", "138", "08:00")], &[]);
    let fx = start(config(&[]), cat, utc(2, 30));

    fx.handle.stop().await;
    assert!(fx.handle.is_stopped());
    fx.handle.stop().await;

    // No periodic pass runs after stop, so a critical delay goes unnoticed.
    fx.clock.set(utc(3, 30));
    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(fx.alerts.load(Ordering::SeqCst), 0);
}
