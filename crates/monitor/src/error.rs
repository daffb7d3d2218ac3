//! Monitor error types.

use thiserror::Error;

/// Why a trip's scheduled departure could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DepartureError {
    #[error("missing scheduled departure")]
    Missing,

    #[error("unparsable scheduled departure {0:?}")]
    Unparsable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// The trip is excluded from the current cycle; the monitor keeps running.
    #[error("data error for trip {trip_id}: {source}")]
    Data {
        trip_id: String,
        source: DepartureError,
    },
}

impl MonitorError {
    pub fn trip_id(&self) -> &str {
        match self {
            MonitorError::Data { trip_id, .. } => trip_id,
        }
    }
}
