use std::env;
use std::ffi::CString;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicI32, Ordering};

use nix::unistd::{ForkResult, fork, setsid};
use tracing::warn;

use crate::daemon::pid::PidFile;

#[derive(Debug, thiserror::Error)]
pub enum DetachError {
    #[error("fork failed: {0}")]
    Fork(nix::Error),

    #[error("failed to become session leader: {0}")]
    SessionLeader(nix::Error),

    #[error("failed to change working directory to {path}: {source}")]
    Workdir { path: PathBuf, source: io::Error },

    #[error("failed to redirect standard streams: {0}")]
    Redirect(io::Error),
}

/// The daemonizing sequence:
/// `Foreground → FirstFork → SessionLeader → SecondFork → Detached →
/// StreamsRedirected → Ready`.
///
/// Only the final background process returns, with its own pid; the original
/// process and the intermediate process exit inside. The intermediate process
/// writes the pid file with the grandchild's pid before exiting, which orphans
/// the grandchild onto init and guarantees it can never reacquire a
/// controlling terminal.
pub(crate) fn detach(pid_file: &PidFile, workdir: &Path) -> Result<u32, DetachError> {
    // SAFETY: fork before any threads exist; the surviving child only runs
    // the sequence below.
    match unsafe { fork() }.map_err(DetachError::Fork)? {
        ForkResult::Parent { .. } => process::exit(0),
        ForkResult::Child => {}
    }

    setsid().map_err(DetachError::SessionLeader)?;
    env::set_current_dir(workdir).map_err(|source| DetachError::Workdir {
        path: workdir.to_path_buf(),
        source,
    })?;
    // Do not inherit the caller's file-creation mask.
    // SAFETY: umask only swaps the process mask.
    unsafe {
        libc::umask(0);
    }

    // SAFETY: as above; the intermediate parent only writes the pid file and
    // exits.
    match unsafe { fork() }.map_err(DetachError::Fork)? {
        ForkResult::Parent { child } => {
            if let Err(err) = pid_file.write(child.as_raw() as u32) {
                warn!(error = %err, path = %pid_file.path().display(), "failed to write PID file");
            }
            process::exit(0);
        }
        ForkResult::Child => {}
    }

    let pid = process::id();
    redirect_streams().map_err(DetachError::Redirect)?;
    register_exit_cleanup(pid_file.path(), pid);
    Ok(pid)
}

/// Close the inherited terminal descriptors by pointing fds 0..=2 at the null
/// device.
fn redirect_streams() -> io::Result<()> {
    // SAFETY: raw descriptor plumbing on the three standard fds; the
    // duplicated null device stays open for the life of the process.
    unsafe {
        let fd = libc::open(c"/dev/null".as_ptr(), libc::O_RDWR);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        for target in 0..=2 {
            if libc::dup2(fd, target) < 0 {
                return Err(io::Error::last_os_error());
            }
        }
        if fd > 2 {
            libc::close(fd);
        }
    }
    Ok(())
}

static CLEANUP_PATH: OnceLock<CString> = OnceLock::new();
static CLEANUP_PID: AtomicI32 = AtomicI32::new(0);

extern "C" fn remove_pid_file_at_exit() {
    // Runs in any process that inherits the registration across a fork; only
    // the tracked daemon process may delete the file.
    // SAFETY: getpid and unlink on a NUL-terminated path owned by the static.
    unsafe {
        if libc::getpid() != CLEANUP_PID.load(Ordering::Relaxed) {
            return;
        }
        if let Some(path) = CLEANUP_PATH.get() {
            libc::unlink(path.as_ptr());
        }
    }
}

/// Delete the pid file when this exact process exits normally. Errors are
/// ignored on both registration and removal; cleanup must never block exit.
fn register_exit_cleanup(path: &Path, pid: u32) {
    let Ok(cpath) = CString::new(path.as_os_str().as_bytes()) else {
        return;
    };
    let _ = CLEANUP_PATH.set(cpath);
    CLEANUP_PID.store(pid as i32, Ordering::Relaxed);
    // SAFETY: the handler only reads the statics set above and calls libc.
    unsafe {
        libc::atexit(remove_pid_file_at_exit);
    }
}
