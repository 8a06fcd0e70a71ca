use crate::config::DaemonConfig;
use crate::config::paths::{PathError, Paths};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub level: Level,
    pub log_to_file: bool,
    pub log_to_stderr: bool,
    pub json_format: bool,
    /// Explicit log file path; state-dir default when unset.
    pub log_file: Option<PathBuf>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            log_to_file: false,
            log_to_stderr: true,
            json_format: false,
            log_file: None,
        }
    }
}

impl TracingConfig {
    /// Configuration for the detached daemon: stderr ends up on the null
    /// device after the detach, so everything goes to the log file.
    pub fn for_daemon(config: &DaemonConfig) -> Self {
        Self {
            level: parse_level(&config.log_level),
            log_to_file: true,
            log_to_stderr: false,
            json_format: false,
            log_file: config.log_file.clone(),
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Failed to initialize state directory: {0}")]
    StateDir(#[from] PathError),

    #[error("Failed to open log file {path}: {source}")]
    LogFileOpen { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub struct TracingGuard {
    _default_guard: tracing::subscriber::DefaultGuard,
    file: Option<Arc<Mutex<File>>>,
}

impl Drop for TracingGuard {
    fn drop(&mut self) {
        if let Some(file) = &self.file {
            if let Ok(mut handle) = file.lock() {
                let _ = handle.flush();
            }
        }
    }
}

struct FileWriter {
    file: Arc<Mutex<File>>,
}

impl io::Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file mutex poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("log file mutex poisoned"))?;
        guard.flush()
    }
}

#[derive(Clone)]
struct FileMakeWriter {
    file: Arc<Mutex<File>>,
}

impl FileMakeWriter {
    fn new(file: Arc<Mutex<File>>) -> Self {
        Self { file }
    }
}

impl<'a> MakeWriter<'a> for FileMakeWriter {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

pub fn init_tracing(config: &TracingConfig) -> Result<TracingGuard, TracingError> {
    let env_filter = resolve_env_filter(config);

    let file = if config.log_to_file {
        let path = match &config.log_file {
            Some(path) => path.clone(),
            None => Paths::ensure_state_dir()?.join("prockit.log"),
        };
        let file = File::options()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| TracingError::LogFileOpen { path, source })?;
        Some(Arc::new(Mutex::new(file)))
    } else {
        None
    };

    let default_guard = match (config.log_to_stderr, file.as_ref()) {
        (true, Some(file_ref)) => {
            let file_writer = FileMakeWriter::new(Arc::clone(file_ref));
            if config.json_format {
                let stderr_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                let file_layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stderr_layer)
                    .with(file_layer)
                    .set_default()
            } else {
                let stderr_layer = tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stderr_layer)
                    .with(file_layer)
                    .set_default()
            }
        }
        (true, None) => {
            if config.json_format {
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .set_default()
            } else {
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .set_default()
            }
        }
        (false, Some(file_ref)) => {
            let file_writer = FileMakeWriter::new(Arc::clone(file_ref));
            if config.json_format {
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .set_default()
            } else {
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_level(true)
                    .with_timer(tracing_subscriber::fmt::time::SystemTime);
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer)
                    .set_default()
            }
        }
        (false, None) => tracing_subscriber::registry().with(env_filter).set_default(),
    };

    Ok(TracingGuard {
        _default_guard: default_guard,
        file,
    })
}

fn resolve_env_filter(config: &TracingConfig) -> EnvFilter {
    if config.level == Level::DEBUG {
        EnvFilter::new(Level::DEBUG.as_str())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.as_str()))
    }
}
