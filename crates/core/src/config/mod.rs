mod duration;
mod loader;
mod types;
mod validate;

pub use duration::{parse_duration, Duration};
pub use loader::{load_config, load_config_from_str, render_default_config};
pub use types::*;
pub use validate::validate_config;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}
