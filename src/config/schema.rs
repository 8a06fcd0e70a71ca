use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::Paths;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Root configuration for prockit.
///
/// Example:
/// ```toml
/// [daemon]
/// log_level = "info"
///
/// [pool]
/// total = 4
/// max = 2
/// command = ["sh", "-c", "do-work"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Daemon configuration section.
    /// Example: [daemon]
    pub daemon: DaemonConfig,
    /// Worker pool configuration section.
    /// Example: [pool]
    pub pool: PoolConfig,
}

/// Daemon process configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DaemonConfig {
    /// Path to PID file (platform default if not set).
    /// Example: pid_file = "/run/user/1000/prockit/prockit.pid"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid_file: Option<PathBuf>,
    /// Working directory of the detached process.
    /// Example: workdir = "/"
    pub workdir: PathBuf,
    /// Log level (trace, debug, info, warn, error).
    /// Example: log_level = "info"
    pub log_level: String,
    /// Optional log file path (state-dir default when daemonized).
    /// Example: log_file = "/var/log/prockit.log"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            pid_file: Some(Paths::runtime_dir().join("prockit.pid")),
            workdir: PathBuf::from("/"),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of workers to fork in total (0 = fork forever).
    /// Example: total = 4
    pub total: u32,
    /// Maximum concurrently-live workers (0 = unlimited).
    /// Example: max = 2
    pub max: u32,
    /// Cosmetic process title for forked workers.
    /// Example: title = "prockit-worker"
    pub title: String,
    /// Signal broadcast by kill_all.
    /// Example: kill_signal = "SIGUSR1"
    pub kill_signal: String,
    /// Admission-gate poll interval in milliseconds.
    /// Example: poll_interval_ms = 10
    pub poll_interval_ms: u64,
    /// Command each worker runs (argv vector). Empty: the daemon idles
    /// instead of supervising a pool.
    /// Example: command = ["sh", "-c", "do-work"]
    pub command: Vec<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            total: 1,
            max: 0,
            title: "prockit-worker".to_string(),
            kill_signal: "SIGUSR1".to_string(),
            poll_interval_ms: 10,
            command: Vec::new(),
        }
    }
}

impl Config {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from the given path, the standard location, or fall back to
    /// defaults when no file exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Paths::config_file);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
