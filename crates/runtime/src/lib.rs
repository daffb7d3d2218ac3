//! Periodic monitor and rotation tasks plus the operator command handle.

pub mod handle;
pub mod runtime;

pub use handle::FleetHandle;
pub use runtime::FleetRuntime;
