//! `beatlog-config`: logger configuration management.
//!
//! Provides:
//! - Typed config schema (channel, destination, rotation, static fields)
//! - Config file discovery and YAML/TOML/JSON loading
//! - `${ENV_VAR}` substitution
//! - Default value application
//! - Validation with field paths

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::{apply_defaults, DEFAULT_CHANNEL, DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_GENERATIONS};
pub use env::{resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw};
pub use schema::{Destination, LoggerConfig, RotationConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use beatlog_core::LogError;
use serde_json::Value;

/// Load a config file, substitute env vars, apply defaults, and validate.
///
/// This is the main entry point for building a logger from a file.
pub fn load_and_prepare(path: &Path) -> Result<LoggerConfig> {
    let value = load_raw(path)?;
    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;
    finish(value)
}

/// Same pipeline for an in-memory config tree and an explicit variable map.
pub fn prepare_with_env(value: &Value, env: &HashMap<String, String>) -> Result<LoggerConfig> {
    let value = resolve_env_vars_with(value, env).context("Failed to resolve env vars in config")?;
    finish(value)
}

fn finish(value: Value) -> Result<LoggerConfig> {
    let config: LoggerConfig =
        serde_json::from_value(value).context("Failed to deserialize logger config")?;
    let config = apply_defaults(config);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    if !report.is_valid() {
        for error in &report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        return Err(LogError::invalid_configuration(report.summary()).into());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn prepares_file_logger_config() {
        let env: HashMap<String, String> = [("LOG_DIR".to_string(), "/var/log/shop".to_string())]
            .into_iter()
            .collect();
        let raw = json!({
            "channel": "checkout",
            "destination": "${LOG_DIR}/checkout.log",
            "rotation": {"maxFileSize": 1024}
        });
        let config = prepare_with_env(&raw, &env).unwrap();
        assert_eq!(
            config.destination,
            Some(Destination::from("/var/log/shop/checkout.log"))
        );
        let policy = config.rotation_policy().unwrap().unwrap();
        assert_eq!(policy.max_file_size, 1024);
        assert_eq!(policy.max_generations, DEFAULT_MAX_GENERATIONS);
    }

    #[test]
    fn invalid_bounds_fail_fast() {
        let raw = json!({"destination": "/tmp/x.log", "rotation": {"maxGenerations": 0}});
        let err = prepare_with_env(&raw, &HashMap::new()).unwrap_err();
        let log_err = err.downcast_ref::<LogError>().expect("LogError");
        assert!(matches!(log_err, LogError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("maxGenerations"));
    }

    #[test]
    fn load_and_prepare_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beatlog.yaml");
        std::fs::write(&path, "channel: worker\nminLevel: info\n").unwrap();
        let config = load_and_prepare(&path).unwrap();
        assert_eq!(config.channel.as_deref(), Some("worker"));
        assert_eq!(config.min_level, Some(beatlog_core::LogLevel::Info));
        assert_eq!(config.destination, Some(Destination::Stdout));
    }
}
