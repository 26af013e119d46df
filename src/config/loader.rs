//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::AppConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value `{value}` for {var}")]
    Override { var: &'static str, value: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Resolve the effective configuration for the process.
///
/// A missing file falls back to defaults; environment overrides are applied
/// last and the result is validated once more.
pub fn load_effective(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = if path.exists() {
        load_config(path)?
    } else {
        tracing::info!(path = %path.display(), "Config file not found, using defaults");
        AppConfig::default()
    };

    let config = apply_env_overrides(config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `APP_*` overrides read through `lookup`.
///
/// | variable            | field                      |
/// |---------------------|----------------------------|
/// | `APP_DEBUG`         | `app.debug`                |
/// | `APP_BIND_ADDRESS`  | `listener.bind_address`    |
/// | `APP_LOG_LEVEL`     | `observability.log_level`  |
/// | `APP_TEMPLATES_DIR` | `templates.directory`      |
pub fn apply_env_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("APP_DEBUG") {
        config.app.debug = parse_bool(&value).ok_or(ConfigError::Override {
            var: "APP_DEBUG",
            value,
        })?;
    }
    if let Some(value) = lookup("APP_BIND_ADDRESS") {
        config.listener.bind_address = value;
    }
    if let Some(value) = lookup("APP_LOG_LEVEL") {
        config.observability.log_level = value;
    }
    if let Some(value) = lookup("APP_TEMPLATES_DIR") {
        config.templates.directory = PathBuf::from(value);
    }
    Ok(config)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}
