//! Fork-based worker-pool supervision: bounded concurrency, exit reaping,
//! broadcast shutdown.

pub mod context;
pub mod supervisor;
pub mod task;

pub use context::{MasterIdentity, WorkerContext};
pub use supervisor::{ExitObservation, PoolError, WorkerPool, WorkerSlot};
pub use task::Task;
