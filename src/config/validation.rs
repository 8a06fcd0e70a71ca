use crate::config::schema::Config;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Signals a pool is allowed to broadcast. Kept platform-neutral here; the
/// pool converts the name at construction time.
const KILL_SIGNALS: [&str; 7] = [
    "SIGTERM", "SIGINT", "SIGQUIT", "SIGHUP", "SIGUSR1", "SIGUSR2", "SIGKILL",
];

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown log level '{0}' (expected one of trace, debug, info, warn, error)")]
    UnknownLogLevel(String),

    #[error("unknown kill signal '{0}'")]
    UnknownKillSignal(String),

    #[error("pool command word {index} is empty")]
    EmptyCommandWord { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub warnings: Vec<ValidationWarning>,
}

/// Check a configuration before it reaches the daemonizer or the pool.
/// Misconfigurations that would fail later anyway are errors; legal but
/// surprising settings become warnings.
pub fn validate_config(config: &Config) -> Result<ValidationResult, ValidationError> {
    let mut result = ValidationResult::default();

    if !LOG_LEVELS.contains(&config.daemon.log_level.as_str()) {
        return Err(ValidationError::UnknownLogLevel(
            config.daemon.log_level.clone(),
        ));
    }

    if !KILL_SIGNALS.contains(&config.pool.kill_signal.as_str()) {
        return Err(ValidationError::UnknownKillSignal(
            config.pool.kill_signal.clone(),
        ));
    }

    for (index, word) in config.pool.command.iter().enumerate() {
        if word.trim().is_empty() {
            return Err(ValidationError::EmptyCommandWord { index });
        }
    }

    if config.pool.total == 0 && config.pool.max == 0 {
        result.warnings.push(ValidationWarning {
            message: "pool.total = 0 with pool.max = 0 forks without any bound".to_string(),
        });
    }

    if config.pool.poll_interval_ms == 0 {
        result.warnings.push(ValidationWarning {
            message: "pool.poll_interval_ms = 0 spins the admission gate".to_string(),
        });
    }

    Ok(result)
}
