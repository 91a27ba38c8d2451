//! Build a `Logger` from configuration.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context as _, Result};
use beatlog_config::{
    apply_defaults, config_dir, config_file_path, load_and_prepare, prepare_with_env, validate,
    Destination, LoggerConfig, DEFAULT_CHANNEL,
};
use beatlog_core::{LogError, LogLevel, LogResult};
use serde_json::{Map, Value};
use tracing::info;

use crate::logger::{Logger, Sinks};
use crate::sink::{RotatingFileSink, StreamSink};

/// Build a logger from an already loaded config. Defaults are applied and
/// the config validated again, so hand-built configs are safe to pass.
pub fn build_logger(config: &LoggerConfig) -> LogResult<Logger> {
    let config = apply_defaults(config.clone());
    let report = validate(&config);
    if !report.is_valid() {
        return Err(LogError::invalid_configuration(report.summary()));
    }

    let destination = config.destination.clone().unwrap_or(Destination::Stdout);
    let sinks = match &destination {
        Destination::Stdout => Sinks::single(StreamSink::stdout()),
        Destination::Stderr => Sinks::single(StreamSink::stderr()),
        Destination::Split => Sinks::split(StreamSink::stdout(), StreamSink::stderr()),
        Destination::File(path) => match config.rotation_policy()? {
            Some(policy) => Sinks::single(RotatingFileSink::new(path, policy)?),
            None => Sinks::single(RotatingFileSink::unbounded(path)?),
        },
    };

    let channel = config
        .channel
        .clone()
        .unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
    info!(channel = %channel, destination = %destination, "Logger configured");

    Ok(Logger::builder(channel)
        .min_level(config.min_level.unwrap_or(LogLevel::Debug))
        .http_context(config.http_context.unwrap_or(true))
        .static_fields(config.extra.unwrap_or_default())
        .sinks(sinks)
        .build())
}

/// Load, resolve and validate a config file, then build the logger.
pub fn logger_from_file(path: &Path) -> Result<Logger> {
    let config = load_and_prepare(path)?;
    build_logger(&config)
        .with_context(|| format!("Failed to build logger from {}", path.display()))
}

/// Build a logger from `beatlog.yaml` in the default config directory
/// (`BEATLOG_CONFIG_DIR`, else the platform config dir). A missing file
/// gives the default stdout logger.
pub fn logger_from_default_config() -> Result<Logger> {
    logger_from_config_dir(&config_dir())
}

/// Build a logger from `beatlog.yaml` inside `dir`.
pub fn logger_from_config_dir(dir: &Path) -> Result<Logger> {
    logger_from_file(&config_file_path(dir))
}

/// Build a logger from a loose configuration map, resolving `${VAR}`
/// references against the process environment.
pub fn logger_from_map(map: Map<String, Value>) -> Result<Logger> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let config = prepare_with_env(&Value::Object(map), &env)?;
    build_logger(&config).context("Failed to build logger from config map")
}
