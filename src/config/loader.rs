//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::EngineConfig;
use crate::config::validation::ValidationError;
use crate::routing::router::Dispatcher;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// Parse and validate configuration text.
pub fn parse_config(content: &str) -> Result<Dispatcher, ConfigError> {
    let config: EngineConfig = toml::from_str(content)?;
    Dispatcher::from_config(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Dispatcher, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
