//! Lifecycle event hooks consumed by the daemonizer and the worker pool.

pub mod events;
pub mod registry;

pub use events::{EventSeverity, HookKind, LifecycleEvent, WorkerExit};
pub use registry::Hooks;
