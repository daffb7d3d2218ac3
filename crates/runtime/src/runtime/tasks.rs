use std::sync::Arc;

use fleetwatch_monitor::TickReport;
use fleetwatch_notify::FleetEvent;
use fleetwatch_queue::{RotationError, RotationOutcome};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::core::QueueState;
use super::Shared;

/// Re-evaluate tracked trips once per monitor interval. The first pass runs
/// immediately.
pub(crate) async fn monitor_loop(shared: Arc<Shared>) {
    let period = shared.config.monitor.interval();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = period.as_secs(), "monitor task started");

    run_until_shutdown(&shared, interval, |shared| async move {
        monitor_pass(&shared).await;
    })
    .await;

    info!("monitor task stopped");
}

/// Fire the rotation once per rotation period, starting one period from now.
pub(crate) async fn rotation_loop(shared: Arc<Shared>) {
    let period = shared.config.rotation.period();
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(period_secs = period.as_secs(), "rotation task started");

    run_until_shutdown(&shared, interval, |shared| async move {
        // Failures are already logged and broadcast by the pass.
        let _ = rotation_pass(&shared).await;
    })
    .await;

    info!("rotation task stopped");
}

/// Drive `pass` on every interval tick until shutdown is signalled. A pass
/// that is already running finishes before the loop exits.
async fn run_until_shutdown<F, Fut>(shared: &Arc<Shared>, mut interval: Interval, pass: F)
where
    F: Fn(Arc<Shared>) -> Fut,
    Fut: std::future::Future<Output = ()>,
{
    loop {
        let shutdown = shared.shutdown_notified();
        tokio::pin!(shutdown);
        // Register before checking the flag so a concurrent stop is not missed.
        shutdown.as_mut().enable();
        if shared.is_shutting_down() {
            break;
        }

        tokio::select! {
            _ = interval.tick() => pass(shared.clone()).await,
            _ = &mut shutdown => break,
        }
    }
}

/// One monitor pass: pull the catalog, reconcile, classify, broadcast.
pub(crate) async fn monitor_pass(shared: &Shared) -> TickReport {
    let trips = shared.catalog.list_tracked_trips();
    let now = shared.clock.now();

    let report = {
        let mut monitor = shared.monitor.lock().await;
        monitor.sync_trips(trips);
        monitor.tick(now)
    };

    for alert in &report.alerts {
        shared.emit(FleetEvent::AlertRaised {
            trip_id: alert.trip_id.clone(),
            severity: alert.severity,
            message: alert.message.clone(),
        });
    }
    for escalation in &report.escalations {
        shared.emit(FleetEvent::TripEscalated {
            trip_id: escalation.trip_id.clone(),
            from: escalation.from,
            to: escalation.to,
            delay_minutes: escalation.delay_minutes,
        });
    }
    for error in &report.data_errors {
        shared.emit(FleetEvent::DataError {
            trip_id: error.trip_id().to_string(),
            reason: error.to_string(),
        });
    }

    if !report.is_quiet() {
        debug!(
            escalations = report.escalations.len(),
            alerts = report.alerts.len(),
            suppressed = report.suppressed.len(),
            "monitor pass produced events"
        );
    }
    report
}

/// One rotation pass under the queue lock.
pub(crate) async fn rotation_pass(shared: &Shared) -> Result<RotationOutcome, RotationError> {
    let now = shared.clock.now();

    let (result, order) = {
        let mut state = shared.queue.lock().await;
        let QueueState { queue, rotation } = &mut *state;
        let result = rotation.fire(queue, now);
        (result, queue.order())
    };

    match &result {
        Ok(RotationOutcome::Committed { bus_id, slot }) => {
            shared.emit(FleetEvent::AssignmentCommitted {
                bus_id: bus_id.clone(),
                slot: slot.clone(),
            });
            shared.emit(FleetEvent::QueueChanged { order });
        }
        Ok(RotationOutcome::EmptyQueue) => {
            shared.emit(FleetEvent::RotationSkipped {
                reason: "queue is empty".to_string(),
            });
        }
        Ok(RotationOutcome::Disabled) => {}
        Err(e) => {
            warn!(error = %e, "rotation pass failed");
            shared.emit(FleetEvent::RotationSkipped { reason: e.to_string() });
        }
    }
    result
}

