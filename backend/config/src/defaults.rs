//! Config defaults: fills every optional field a logger needs.

use beatlog_core::{GenerationNaming, LogLevel};

use crate::schema::{Destination, LoggerConfig, RotationConfig};

pub const DEFAULT_CHANNEL: &str = "missing channel name";

/// 100 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 104_857_600;

pub const DEFAULT_MAX_GENERATIONS: u32 = 5;

/// Apply all defaults to a freshly loaded config.
pub fn apply_defaults(config: LoggerConfig) -> LoggerConfig {
    let config = apply_channel_defaults(config);
    let config = apply_destination_defaults(config);
    let config = apply_rotation_defaults(config);
    apply_enrichment_defaults(config)
}

fn apply_channel_defaults(mut config: LoggerConfig) -> LoggerConfig {
    if config.channel.as_deref().map(str::trim).unwrap_or("").is_empty() {
        config.channel = Some(DEFAULT_CHANNEL.to_string());
    }
    config
}

fn apply_destination_defaults(mut config: LoggerConfig) -> LoggerConfig {
    config.destination.get_or_insert(Destination::Stdout);
    config
}

/// File destinations rotate unless told otherwise; streams never do.
fn apply_rotation_defaults(mut config: LoggerConfig) -> LoggerConfig {
    let is_file = config.destination.as_ref().is_some_and(Destination::is_file);
    let rotation = config.rotation.get_or_insert_with(RotationConfig::default);
    rotation.enabled.get_or_insert(is_file);
    rotation.max_file_size.get_or_insert(DEFAULT_MAX_FILE_SIZE);
    rotation.max_generations.get_or_insert(DEFAULT_MAX_GENERATIONS);
    rotation.naming.get_or_insert(GenerationNaming::Suffix);
    config
}

fn apply_enrichment_defaults(mut config: LoggerConfig) -> LoggerConfig {
    config.http_context.get_or_insert(true);
    config.min_level.get_or_insert(LogLevel::Debug);
    config.extra.get_or_insert_with(Default::default);
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn empty_config_gets_stdout_without_rotation() {
        let config = apply_defaults(LoggerConfig::default());
        assert_eq!(config.channel.as_deref(), Some(DEFAULT_CHANNEL));
        assert_eq!(config.destination, Some(Destination::Stdout));
        let rotation = config.rotation.unwrap();
        assert_eq!(rotation.enabled, Some(false));
        assert_eq!(rotation.max_file_size, Some(DEFAULT_MAX_FILE_SIZE));
        assert_eq!(rotation.max_generations, Some(DEFAULT_MAX_GENERATIONS));
        assert_eq!(config.http_context, Some(true));
        assert_eq!(config.min_level, Some(LogLevel::Debug));
    }

    #[test]
    fn file_destination_rotates_by_default() {
        let config = apply_defaults(LoggerConfig {
            destination: Some(Destination::File(PathBuf::from("/tmp/app.log"))),
            ..Default::default()
        });
        assert_eq!(config.rotation.unwrap().enabled, Some(true));
    }

    #[test]
    fn explicit_values_are_kept() {
        let config = apply_defaults(LoggerConfig {
            channel: Some("orders".into()),
            rotation: Some(RotationConfig {
                max_generations: Some(2),
                ..Default::default()
            }),
            http_context: Some(false),
            ..Default::default()
        });
        assert_eq!(config.channel.as_deref(), Some("orders"));
        assert_eq!(config.rotation.unwrap().max_generations, Some(2));
        assert_eq!(config.http_context, Some(false));
    }
}
