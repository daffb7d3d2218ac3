//! Read-only schedule catalog: the snapshot of trips and idle buses the core
//! works from. Fetching and refreshing the data happens outside this crate.

use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{IdleBus, Trip};

/// Pull-based provider of the current schedule snapshot.
pub trait ScheduleCatalog: Send + Sync {
    /// Trips that have not yet departed and are not cancelled.
    fn list_tracked_trips(&self) -> Vec<Trip>;

    /// Buses that are idle and available for assignment.
    fn list_idle_buses(&self) -> Vec<IdleBus>;
}

/// Serialized form of a catalog snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default)]
    pub idle_buses: Vec<IdleBus>,
}

impl CatalogSnapshot {
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }
}

/// In-memory catalog whose snapshot is swapped wholesale by an external refresh.
#[derive(Debug, Default)]
pub struct SnapshotCatalog {
    inner: RwLock<CatalogSnapshot>,
}

impl SnapshotCatalog {
    pub fn new(snapshot: CatalogSnapshot) -> Self {
        Self {
            inner: RwLock::new(snapshot),
        }
    }

    /// Replace the whole snapshot.
    pub fn replace(&self, snapshot: CatalogSnapshot) {
        let mut guard = self.inner.write().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(
            trips = snapshot.trips.len(),
            idle_buses = snapshot.idle_buses.len(),
            "catalog snapshot replaced"
        );
        *guard = snapshot;
    }

    /// Re-read the snapshot from a JSON file. The old snapshot is kept on error.
    pub fn reload_from(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let snapshot = CatalogSnapshot::from_file(path)?;
        self.replace(snapshot);
        Ok(())
    }
}

impl ScheduleCatalog for SnapshotCatalog {
    fn list_tracked_trips(&self) -> Vec<Trip> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .trips
            .clone()
    }

    fn list_idle_buses(&self) -> Vec<IdleBus> {
        self.inner
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .idle_buses
            .clone()
    }
}
