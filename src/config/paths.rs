use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;

/// Platform-specific path resolution for prockit.
pub struct Paths;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory { path: PathBuf, source: io::Error },
}

impl Paths {
    /// Returns the configuration directory path.
    /// - Linux: ~/.config/prockit/
    /// - macOS: ~/Library/Application Support/prockit/
    /// - Override: PROCKIT_CONFIG env var (directory derived from file path)
    pub fn config_dir() -> PathBuf {
        if let Ok(path) = env::var("PROCKIT_CONFIG") {
            let path = PathBuf::from(path);
            return path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(PathBuf::from)
                .unwrap_or(path);
        }

        #[cfg(target_os = "linux")]
        {
            dirs::config_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
                .unwrap_or_else(|| PathBuf::from(".config"))
                .join("prockit")
        }

        #[cfg(target_os = "macos")]
        {
            dirs::config_dir()
                .or_else(|| {
                    dirs::home_dir().map(|home| home.join("Library").join("Application Support"))
                })
                .unwrap_or_else(|| PathBuf::from("~/Library/Application Support"))
                .join("prockit")
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            PathBuf::from(".prockit")
        }
    }

    /// Returns the full config file path.
    pub fn config_file() -> PathBuf {
        if let Ok(path) = env::var("PROCKIT_CONFIG") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Returns the state directory path (log files).
    /// - Linux: ~/.local/state/prockit/
    /// - macOS: ~/Library/Application Support/prockit/
    /// - Override: PROCKIT_STATE env var
    pub fn state_dir() -> PathBuf {
        if let Ok(path) = env::var("PROCKIT_STATE") {
            return PathBuf::from(path);
        }

        #[cfg(target_os = "linux")]
        {
            dirs::state_dir()
                .or_else(|| dirs::home_dir().map(|home| home.join(".local/state")))
                .unwrap_or_else(|| PathBuf::from(".local/state"))
                .join("prockit")
        }

        #[cfg(target_os = "macos")]
        {
            Self::config_dir()
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            PathBuf::from(".prockit")
        }
    }

    /// Returns the runtime directory path (pid file).
    /// - Linux: /run/user/{uid}/prockit/
    /// - macOS: /tmp/prockit-{uid}/
    /// - Override: PROCKIT_RUNTIME env var
    pub fn runtime_dir() -> PathBuf {
        if let Ok(path) = env::var("PROCKIT_RUNTIME") {
            return PathBuf::from(path);
        }

        #[cfg(target_os = "linux")]
        {
            let runtime_root = dirs::runtime_dir().unwrap_or_else(|| {
                let uid = unsafe { libc::getuid() };
                PathBuf::from(format!("/run/user/{uid}"))
            });
            runtime_root.join("prockit")
        }

        #[cfg(target_os = "macos")]
        {
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/prockit-{uid}"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            PathBuf::from(".prockit/run")
        }
    }

    /// Ensures the state directory exists, creating it if necessary.
    pub fn ensure_state_dir() -> Result<PathBuf, PathError> {
        let dir = Self::state_dir();
        fs::create_dir_all(&dir).map_err(|source| PathError::CreateDirectory {
            path: dir.clone(),
            source,
        })?;
        Ok(dir)
    }
}
