//! Operator command handle for a running fleet.

use std::sync::{Arc, Mutex};

use fleetwatch_core::{Config, IdleBus, Trip};
use fleetwatch_monitor::TickReport;
use fleetwatch_notify::FleetEvent;
use fleetwatch_queue::{QueueEntry, QueueError, RotationError, RotationOutcome};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::runtime::Shared;

/// Cloneable handle to the monitor, the queue and the event stream.
///
/// Every command takes the relevant lock for its whole pass, so callers never
/// see a half-applied change.
#[derive(Clone)]
pub struct FleetHandle {
    shared: Arc<Shared>,
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl FleetHandle {
    pub(crate) fn new(shared: Arc<Shared>, tasks: Vec<JoinHandle<()>>) -> Self {
        Self {
            shared,
            tasks: Arc::new(Mutex::new(tasks)),
        }
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.shared.events.subscribe()
    }

    // ── Monitor ─────────────────────────────────────────────────

    pub async fn trips(&self) -> Vec<Trip> {
        self.shared.monitor.lock().await.trips().cloned().collect()
    }

    pub async fn trip(&self, trip_id: &str) -> Option<Trip> {
        self.shared.monitor.lock().await.trip(trip_id).cloned()
    }

    /// Trips currently behind schedule, most severe first.
    pub async fn alerts(&self) -> Vec<Trip> {
        self.shared
            .monitor
            .lock()
            .await
            .alerts()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Run a monitor pass now, outside the periodic schedule.
    pub async fn tick_monitor(&self) -> TickReport {
        crate::runtime::monitor_pass(&self.shared).await
    }

    // ── Queue ───────────────────────────────────────────────────

    pub async fn queue(&self) -> Vec<QueueEntry> {
        self.shared.queue.lock().await.queue.entries().to_vec()
    }

    pub async fn promote(&self, bus_id: &str) -> Result<usize, QueueError> {
        let (position, order) = {
            let mut state = self.shared.queue.lock().await;
            let position = state.queue.promote(bus_id)?;
            (position, state.queue.order())
        };
        info!(bus_id, position, "bus promoted by operator");
        self.shared.emit(FleetEvent::QueueChanged { order });
        Ok(position)
    }

    pub async fn remove(&self, bus_id: &str) -> Result<QueueEntry, QueueError> {
        let (removed, order) = {
            let mut state = self.shared.queue.lock().await;
            let removed = state.queue.remove(bus_id)?;
            (removed, state.queue.order())
        };
        info!(bus_id, "bus removed by operator");
        self.shared.emit(FleetEvent::QueueChanged { order });
        Ok(removed)
    }

    pub async fn enqueue(&self, bus: IdleBus) -> Result<usize, QueueError> {
        let (position, order) = {
            let mut state = self.shared.queue.lock().await;
            let position = state.queue.enqueue(bus)?;
            (position, state.queue.order())
        };
        self.shared.emit(FleetEvent::QueueChanged { order });
        Ok(position)
    }

    /// Enqueue catalog idle buses that are not queued yet. Returns how many
    /// were added.
    pub async fn sync_idle_buses(&self) -> usize {
        let buses = self.shared.catalog.list_idle_buses();
        let (added, order) = {
            let mut state = self.shared.queue.lock().await;
            let added = state.queue.sync_idle(buses);
            (added, state.queue.order())
        };
        if added > 0 {
            info!(added, queued = order.len(), "idle buses enqueued from catalog");
            self.shared.emit(FleetEvent::QueueChanged { order });
        }
        added
    }

    // ── Rotation ────────────────────────────────────────────────

    pub async fn set_rotation_enabled(&self, enabled: bool) {
        self.shared.queue.lock().await.rotation.set_enabled(enabled);
    }

    pub async fn rotation_enabled(&self) -> bool {
        self.shared.queue.lock().await.rotation.is_enabled()
    }

    /// Run a rotation step now, outside the periodic schedule.
    pub async fn fire_rotation(&self) -> Result<RotationOutcome, RotationError> {
        crate::runtime::rotation_pass(&self.shared).await
    }

    // ── Lifecycle ───────────────────────────────────────────────

    pub fn is_stopped(&self) -> bool {
        self.shared.is_shutting_down()
    }

    /// Cancel both periodic tasks and wait for any in-flight pass to finish.
    /// Calling it again is a no-op.
    pub async fn stop(&self) {
        self.shared.signal_shutdown();
        let tasks = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(|e| e.into_inner()));
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "fleet task ended abnormally");
            }
        }
        info!("fleet runtime stopped");
    }
}
