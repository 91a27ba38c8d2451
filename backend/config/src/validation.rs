//! Config validation: collects every problem in one pass.

use thiserror::Error;

use crate::schema::{Destination, LoggerConfig};

/// Top-level keys the formatter writes itself.
const RESERVED_FIELDS: &[&str] = &[
    "@timestamp",
    "log.level",
    "log.channel",
    "log.severity",
    "message",
    "stream",
];

/// A validation finding with the offending field path.
#[derive(Debug, Error)]
#[error("config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All errors joined into one line, for `InvalidConfiguration`.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &LoggerConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_channel(config, &mut report);
    validate_destination(config, &mut report);
    validate_rotation(config, &mut report);
    validate_extra(config, &mut report);
    report
}

fn validate_channel(config: &LoggerConfig, report: &mut ValidationReport) {
    if let Some(channel) = &config.channel {
        if channel.trim().is_empty() {
            report.error("channel", "channel cannot be empty");
        }
    }
}

fn validate_destination(config: &LoggerConfig, report: &mut ValidationReport) {
    let Some(Destination::File(path)) = &config.destination else { return };
    if path.as_os_str().is_empty() {
        report.error("destination", "file destination needs a path");
    } else if path.is_dir() {
        report.error("destination", format!("{} is a directory", path.display()));
    }
}

fn validate_rotation(config: &LoggerConfig, report: &mut ValidationReport) {
    let Some(rotation) = &config.rotation else { return };
    if rotation.max_file_size == Some(0) {
        report.error("rotation.maxFileSize", "maxFileSize must be larger than 0");
    }
    if rotation.max_generations == Some(0) {
        report.error("rotation.maxGenerations", "maxGenerations must be larger than 0");
    }
    let is_file = config.destination.as_ref().is_some_and(Destination::is_file);
    if rotation.enabled == Some(true) && !is_file {
        report.warn(
            "rotation.enabled",
            "rotation only applies to file destinations and will be ignored",
        );
    }
}

fn validate_extra(config: &LoggerConfig, report: &mut ValidationReport) {
    let Some(extra) = &config.extra else { return };
    for key in extra.keys() {
        if RESERVED_FIELDS.contains(&key.as_str()) {
            report.warn(
                format!("extra.{key}"),
                "field is written by the formatter and will be overwritten",
            );
        }
    }
}
