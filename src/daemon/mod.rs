//! Daemonization: the double-fork detach sequence with pid-file
//! single-instance semantics.

pub mod core;
pub mod detach;
pub mod pid;

pub use self::core::{DaemonError, DaemonStatus, Daemonizer};
pub use detach::DetachError;
pub use pid::{PidError, PidFile};
