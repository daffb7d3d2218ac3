//! Fleet runtime: wires the monitor, queue and sinks into two periodic tasks.
//!
//! - `core`: shared state and startup
//! - `tasks`: the monitor and rotation loops and their single passes

mod core;
mod tasks;

pub use self::core::FleetRuntime;
pub(crate) use self::core::Shared;
pub(crate) use self::tasks::{monitor_pass, rotation_pass};
