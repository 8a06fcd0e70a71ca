//! Process-level plumbing shared by the daemonizer and the worker pool:
//! capability gating, role identity, cosmetic process titles.

#[derive(Debug, thiserror::Error)]
pub enum UnsupportedError {
    #[error("process control requires fork/signal facilities not available on this platform")]
    EnvironmentUnsupported,
}

/// Which side of a fork the current code runs on. Captured once at
/// construction time and threaded through explicitly, never stored in a
/// process-wide singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRole {
    Master,
    Worker,
    Daemon,
}

/// Checked at component construction; everything downstream may assume
/// fork/signal/wait are present.
pub fn ensure_supported() -> Result<(), UnsupportedError> {
    if cfg!(unix) {
        Ok(())
    } else {
        Err(UnsupportedError::EnvironmentUnsupported)
    }
}

/// Best-effort cosmetic label for process-table inspection tools.
/// PR_SET_NAME truncates to 15 bytes.
#[cfg(target_os = "linux")]
pub fn set_process_title(title: &str) {
    let truncated: Vec<u8> = title.bytes().take(15).collect();
    if let Ok(name) = std::ffi::CString::new(truncated) {
        // SAFETY: PR_SET_NAME copies the NUL-terminated string out of `name`
        // before the call returns.
        unsafe {
            libc::prctl(libc::PR_SET_NAME, name.as_ptr(), 0, 0, 0);
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_process_title(_title: &str) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn supported_on_unix() {
        assert!(ensure_supported().is_ok());
    }

    #[test]
    fn set_title_accepts_long_and_odd_input() {
        set_process_title("a-title-much-longer-than-fifteen-bytes");
        set_process_title("");
        set_process_title("nul\0inside");
    }
}
