//! Configuration management module.

pub mod paths;
pub mod schema;
pub mod validation;

pub use paths::{PathError, Paths};
pub use schema::{Config, ConfigError, DaemonConfig, PoolConfig};
pub use validation::{ValidationError, ValidationResult, ValidationWarning, validate_config};
