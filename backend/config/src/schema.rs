//! Logger configuration schema.
//!
//! Every field is optional on disk; `defaults::apply_defaults` fills the
//! gaps before a logger is built.

use std::fmt;
use std::path::PathBuf;

use beatlog_core::{GenerationNaming, LogLevel, LogResult, RotationPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::defaults::{DEFAULT_MAX_FILE_SIZE, DEFAULT_MAX_GENERATIONS};

/// Root configuration for one logger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    /// Channel name emitted as `log.channel`
    #[serde(default, alias = "groupname", skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// `stdout`, `stderr`, `split`, or a file path
    #[serde(default, alias = "stream", skip_serializing_if = "Option::is_none")]
    pub destination: Option<Destination>,

    /// Size-based rotation for file destinations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<RotationConfig>,

    /// Static fields merged into every record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Map<String, Value>>,

    /// Enable request/client/user-agent enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_context: Option<bool>,

    /// Records below this level are discarded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_level: Option<LogLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    /// Bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<u64>,
    #[serde(default, alias = "maxFiles", skip_serializing_if = "Option::is_none")]
    pub max_generations: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub naming: Option<GenerationNaming>,
}

/// Where formatted lines go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Destination {
    Stdout,
    Stderr,
    /// stdout for notice and below, stderr above
    Split,
    File(PathBuf),
}

impl Destination {
    pub fn is_file(&self) -> bool {
        matches!(self, Destination::File(_))
    }
}

impl From<&str> for Destination {
    fn from(raw: &str) -> Self {
        match raw.trim() {
            "stdout" => Destination::Stdout,
            "stderr" => Destination::Stderr,
            "split" => Destination::Split,
            path => Destination::File(PathBuf::from(path)),
        }
    }
}

impl From<String> for Destination {
    fn from(raw: String) -> Self {
        Destination::from(raw.as_str())
    }
}

impl From<Destination> for String {
    fn from(dest: Destination) -> Self {
        dest.to_string()
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Stdout => f.write_str("stdout"),
            Destination::Stderr => f.write_str("stderr"),
            Destination::Split => f.write_str("split"),
            Destination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl LoggerConfig {
    /// Parse a loose configuration map (as handed over by an application's
    /// own config system).
    pub fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map))
    }

    /// Rotation bounds for a file destination, or `None` when rotation is
    /// disabled or the destination is a stream. Unset bounds fall back to
    /// the defaults.
    pub fn rotation_policy(&self) -> LogResult<Option<RotationPolicy>> {
        let is_file = self.destination.as_ref().is_some_and(Destination::is_file);
        let rotation = self.rotation.clone().unwrap_or_default();
        if !is_file || rotation.enabled == Some(false) {
            return Ok(None);
        }
        let policy = RotationPolicy::new(
            rotation.max_file_size.unwrap_or(DEFAULT_MAX_FILE_SIZE),
            rotation.max_generations.unwrap_or(DEFAULT_MAX_GENERATIONS),
        )?
        .with_naming(rotation.naming.unwrap_or_default());
        Ok(Some(policy))
    }
}
