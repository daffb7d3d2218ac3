//! Bus assignment queue and cyclic rotation.

pub mod assignment;
pub mod error;
pub mod rotation;

pub use assignment::{AssignmentQueue, QueueEntry};
pub use error::{QueueError, RotationError};
pub use rotation::{RotationOutcome, RotationScheduler};
