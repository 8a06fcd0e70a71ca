use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Paths;

#[derive(Debug, thiserror::Error)]
pub enum PidError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse PID from file: {0}")]
    Parse(String),
}

/// A plain-text file whose entire contents are the decimal pid of the running
/// instance. Presence means "instance active" — best-effort only: a process
/// that died without cleanup leaves the file behind, and nothing here second-
/// guesses it.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Pid file at the standard runtime location.
    pub fn new() -> Self {
        Self {
            path: Paths::runtime_dir().join("prockit.pid"),
        }
    }

    /// Pid file at a caller-chosen path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the recorded pid.
    pub fn read(&self) -> Result<u32, PidError> {
        let contents = fs::read_to_string(&self.path)?;
        contents
            .trim()
            .parse()
            .map_err(|_| PidError::Parse(contents.trim().to_string()))
    }

    /// Persist `pid`, creating the parent directory when missing.
    pub fn write(&self, pid: u32) -> Result<(), PidError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.path)?;
        file.write_all(pid.to_string().as_bytes())?;
        file.sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o644))?;
        }

        info!(pid = pid, path = %self.path.display(), "PID file written");
        Ok(())
    }

    /// Remove the file. Missing file is not an error; the shutdown path must
    /// never fail on cleanup.
    pub fn remove(&self) -> Result<(), PidError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            info!(path = %self.path.display(), "PID file removed");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for PidFile {
    fn default() -> Self {
        Self::new()
    }
}
