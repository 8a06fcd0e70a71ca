use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::daemon::detach::{DetachError, detach};
use crate::daemon::pid::{PidError, PidFile};
use crate::hooks::{Hooks, LifecycleEvent};
use crate::process::{self, UnsupportedError};
use crate::signals::{self, SignalError};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("daemon already running (PID: {pid})")]
    AlreadyRunning { pid: u32 },

    #[error(transparent)]
    Detach(#[from] DetachError),

    #[error(transparent)]
    Pid(#[from] PidError),

    #[error(transparent)]
    Signals(#[from] SignalError),

    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),
}

/// What `status()` can report. Presence of the pid file is the whole truth:
/// a crashed instance that left the file behind is still reported as running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaemonStatus {
    Running { pid: Option<u32> },
    NotRunning,
}

/// Turns a foreground task into a detached background service with
/// start/stop/status/reload semantics and a single-instance guarantee.
///
/// `start` never returns in the original process: the caller's process exits
/// at the first fork point, and only the final background process runs the
/// task.
pub struct Daemonizer {
    pid_file: PidFile,
    workdir: PathBuf,
    hooks: Hooks,
    daemon_pid: Option<u32>,
}

impl Daemonizer {
    pub fn new() -> Result<Self, UnsupportedError> {
        process::ensure_supported()?;
        Ok(Self {
            pid_file: PidFile::new(),
            workdir: PathBuf::from("/"),
            hooks: Hooks::new(),
            daemon_pid: None,
        })
    }

    pub fn pid_file(mut self, pid_file: PidFile) -> Self {
        self.pid_file = pid_file;
        self
    }

    /// Stable root the detached process switches to (default `/`).
    pub fn workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Pid of the background process, recorded after a successful `start`.
    pub fn daemon_pid(&self) -> Option<u32> {
        self.daemon_pid
    }

    /// Daemonize and run `task` in the background process. Returns once the
    /// task returns; the pid file is removed by the exit hook when this
    /// process terminates normally, or by the SIGTERM handler.
    pub fn start<F: FnOnce()>(&mut self, task: F) -> Result<(), DaemonError> {
        if self.pid_file.exists() {
            let pid = self.pid_file.read()?;
            return Err(DaemonError::AlreadyRunning { pid });
        }

        let pid = detach(&self.pid_file, &self.workdir)?;
        self.daemon_pid = Some(pid);
        signals::install_daemon_exit_handler(self.pid_file.path())?;
        info!(pid = pid, "daemon detached");

        self.hooks.trigger(&LifecycleEvent::started(pid));
        task();
        Ok(())
    }

    /// Best-effort stop: signal whatever pid the file records and return.
    /// Does not verify the target actually exited; with no pid file present,
    /// sends nothing and still emits both hooks.
    pub fn stop(&mut self) -> Result<(), DaemonError> {
        self.hooks.trigger(&LifecycleEvent::stopping());
        if let Ok(pid) = self.pid_file.read() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => info!(pid = pid, "termination signal sent"),
                Err(err) => warn!(pid = pid, error = %err, "failed to signal daemon"),
            }
        }
        self.hooks.trigger(&LifecycleEvent::stopped());
        Ok(())
    }

    pub fn status(&self) -> DaemonStatus {
        if self.pid_file.exists() {
            DaemonStatus::Running {
                pid: self.pid_file.read().ok(),
            }
        } else {
            DaemonStatus::NotRunning
        }
    }

    /// `stop` followed by `start`, with a bounded wait for the old instance
    /// to release its pid file in between. On timeout the start proceeds and
    /// surfaces `AlreadyRunning`, exactly as an immediate retry would.
    pub fn reload<F: FnOnce()>(&mut self, task: F) -> Result<(), DaemonError> {
        self.stop()?;
        self.await_release();
        self.start(task)
    }

    fn await_release(&self) {
        for _ in 0..50 {
            if !self.pid_file.exists() {
                return;
            }
            thread::sleep(Duration::from_millis(100));
        }
        warn!(
            path = %self.pid_file.path().display(),
            "previous instance did not release its PID file"
        );
    }
}
