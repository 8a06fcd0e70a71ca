//! Signal routing for the supervisor loops.
//!
//! Master-side handlers only flip per-signal pending flags; [`SignalRouter::drain`]
//! turns the flags into [`Signal`] values on the main control flow between
//! supervisor iterations, so worker bookkeeping is never mutated inside an
//! asynchronous handler. Terminal dispositions for forked workers and for the
//! daemonized process are direct handlers restricted to async-signal-safe
//! calls (`unlink`, `_exit`).

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("failed to install handler for {signal}: {source}")]
    Install {
        signal: Signal,
        source: nix::Error,
    },

    #[error("pid file path contains an interior NUL byte")]
    BadPidFilePath,
}

/// One flag per signal number; delivery coalesces, which matches the
/// best-effort contract (a burst of identical signals dispatches once).
const MAX_SIGNO: usize = 64;
static PENDING: [AtomicBool; MAX_SIGNO] = [const { AtomicBool::new(false) }; MAX_SIGNO];

extern "C" fn note_signal(signo: libc::c_int) {
    let signo = signo as usize;
    if signo < MAX_SIGNO {
        PENDING[signo].store(true, Ordering::Relaxed);
    }
}

/// Routes a fixed set of signals to pending flags, drained synchronously by
/// the owning loop.
#[derive(Debug)]
pub struct SignalRouter {
    watched: Vec<Signal>,
}

impl SignalRouter {
    pub fn install(signals: &[Signal]) -> Result<Self, SignalError> {
        let action = SigAction::new(
            SigHandler::Handler(note_signal),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        for &signal in signals {
            // SAFETY: note_signal only stores to a static atomic, which is
            // async-signal-safe.
            unsafe { sigaction(signal, &action) }
                .map_err(|source| SignalError::Install { signal, source })?;
        }
        Ok(Self {
            watched: signals.to_vec(),
        })
    }

    /// Collect and clear pending deliveries, in watch order.
    pub fn drain(&self) -> Vec<Signal> {
        self.watched
            .iter()
            .copied()
            .filter(|signal| PENDING[*signal as usize].swap(false, Ordering::Relaxed))
            .collect()
    }

    /// Discard deliveries noted before now. A freshly forked child calls this
    /// so it never acts on a flag raised in its parent.
    pub fn clear_pending(&self) {
        for &signal in &self.watched {
            PENDING[signal as usize].store(false, Ordering::Relaxed);
        }
    }

    pub fn watched(&self) -> &[Signal] {
        &self.watched
    }
}

extern "C" fn worker_exit(_signo: libc::c_int) {
    // SAFETY: _exit is async-signal-safe; no cleanup runs in the worker.
    unsafe { libc::_exit(1) }
}

/// Terminal disposition for a forked worker: any of the stop signals ends the
/// process with status 1 immediately, regardless of what the task is doing.
pub fn install_worker_exit_handlers() -> Result<(), SignalError> {
    let action = SigAction::new(
        SigHandler::Handler(worker_exit),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [Signal::SIGUSR1, Signal::SIGINT, Signal::SIGTERM] {
        // SAFETY: worker_exit only calls _exit.
        unsafe { sigaction(signal, &action) }
            .map_err(|source| SignalError::Install { signal, source })?;
    }
    Ok(())
}

static DAEMON_PID_FILE: OnceLock<CString> = OnceLock::new();

extern "C" fn daemon_exit(_signo: libc::c_int) {
    // Best-effort pid file removal; unlink and _exit are async-signal-safe.
    if let Some(path) = DAEMON_PID_FILE.get() {
        // SAFETY: path is a valid NUL-terminated string owned by the static.
        unsafe {
            libc::unlink(path.as_ptr());
        }
    }
    // SAFETY: terminating the process from a signal handler.
    unsafe { libc::_exit(1) }
}

/// Terminal disposition for the daemonized process: SIGTERM removes the pid
/// file (errors ignored) and exits with a non-zero status.
pub fn install_daemon_exit_handler(pid_file: &Path) -> Result<(), SignalError> {
    let path = CString::new(pid_file.as_os_str().as_bytes())
        .map_err(|_| SignalError::BadPidFilePath)?;
    let _ = DAEMON_PID_FILE.set(path);
    let action = SigAction::new(
        SigHandler::Handler(daemon_exit),
        SaFlags::empty(),
        SigSet::empty(),
    );
    // SAFETY: daemon_exit is restricted to unlink + _exit.
    unsafe { sigaction(Signal::SIGTERM, &action) }.map_err(|source| SignalError::Install {
        signal: Signal::SIGTERM,
        source,
    })?;
    Ok(())
}
