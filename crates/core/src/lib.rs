pub mod catalog;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod model;

pub use catalog::{CatalogSnapshot, ScheduleCatalog, SnapshotCatalog};
pub use clock::{ManualClock, SharedClock, SystemClock, TimeSource};
pub use config::Config;
pub use error::*;
pub use model::*;
