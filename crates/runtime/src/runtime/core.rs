use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fleetwatch_core::{Config, ScheduleCatalog, SharedClock, SystemClock};
use fleetwatch_monitor::DelayMonitor;
use fleetwatch_notify::{AssignmentSink, ChannelSink, FleetEvent, NotificationSink};
use fleetwatch_queue::{AssignmentQueue, RotationScheduler};
use tokio::sync::futures::Notified;
use tokio::sync::{Mutex, Notify};
use tracing::info;

use crate::handle::FleetHandle;

use super::tasks;

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// The queue and the scheduler that rotates it share one lock so a rotation
/// tick and an operator command never interleave.
pub(crate) struct QueueState {
    pub(crate) queue: AssignmentQueue,
    pub(crate) rotation: RotationScheduler,
}

/// State shared by the periodic tasks and every [`FleetHandle`].
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) catalog: Arc<dyn ScheduleCatalog>,
    pub(crate) monitor: Mutex<DelayMonitor>,
    pub(crate) queue: Mutex<QueueState>,
    pub(crate) events: ChannelSink,
    pub(crate) clock: SharedClock,
    shutdown: AtomicBool,
    shutdown_notify: Notify,
}

impl Shared {
    pub(crate) fn emit(&self, event: FleetEvent) {
        self.events.emit(event);
    }

    pub(crate) fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_notified(&self) -> Notified<'_> {
        self.shutdown_notify.notified()
    }

    pub(crate) fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }
}

/// Builder for a running fleet: monitor task, rotation task and command handle.
pub struct FleetRuntime {
    config: Config,
    clock: SharedClock,
    event_capacity: usize,
}

impl FleetRuntime {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Use a custom time source for classification and debouncing.
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Start with the system clock and default settings.
    pub fn start(
        config: Config,
        catalog: Arc<dyn ScheduleCatalog>,
        notification_sink: Arc<dyn NotificationSink>,
        assignment_sink: Arc<dyn AssignmentSink>,
    ) -> FleetHandle {
        Self::new(config).spawn(catalog, notification_sink, assignment_sink)
    }

    /// Seed the queue from the catalog and spawn both periodic tasks.
    ///
    /// Must be called from within a tokio runtime. Alerts go to
    /// `notification_sink`; each monitor pass then broadcasts them to
    /// subscribers whether or not delivery succeeded.
    pub fn spawn(
        self,
        catalog: Arc<dyn ScheduleCatalog>,
        notification_sink: Arc<dyn NotificationSink>,
        assignment_sink: Arc<dyn AssignmentSink>,
    ) -> FleetHandle {
        let events = ChannelSink::with_capacity(self.event_capacity);
        let monitor =
            DelayMonitor::new(&self.config.monitor, self.clock.clone(), notification_sink);
        let rotation = RotationScheduler::from_config(&self.config.rotation, assignment_sink);

        let mut queue = AssignmentQueue::new();
        let seeded = queue.sync_idle(catalog.list_idle_buses());
        if let Some(first) = self.clock.now().checked_add_signed(rotation.cadence()) {
            queue.set_next_assignment(first, rotation.cadence());
        }

        info!(
            profile = self.config.profile_label(),
            queued = seeded,
            rotation_enabled = rotation.is_enabled(),
            "fleet runtime starting"
        );

        let shared = Arc::new(Shared {
            config: self.config,
            catalog,
            monitor: Mutex::new(monitor),
            queue: Mutex::new(QueueState { queue, rotation }),
            events,
            clock: self.clock,
            shutdown: AtomicBool::new(false),
            shutdown_notify: Notify::new(),
        });

        let tasks = vec![
            tokio::spawn(tasks::monitor_loop(shared.clone())),
            tokio::spawn(tasks::rotation_loop(shared.clone())),
        ];
        FleetHandle::new(shared, tasks)
    }
}
