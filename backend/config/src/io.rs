//! Config file discovery and parsing.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "beatlog.yaml";

/// Resolve the config directory.
/// Priority: `BEATLOG_CONFIG_DIR` env > platform config dir > `./.beatlog`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("BEATLOG_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::config_dir()
        .map(|d| d.join("beatlog"))
        .unwrap_or_else(|| PathBuf::from(".beatlog"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read a config file into a JSON value tree, picking the parser from the
/// extension (`yaml`/`yml`, `toml`, `json`).
///
/// A missing file yields an empty object so defaults apply.
pub fn load_raw(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let value: Value = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?,
        "toml" => toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config TOML at: {}", path.display()))?,
        "json" => serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config JSON at: {}", path.display()))?,
        other => bail!("Unsupported config format '{other}' for {}", path.display()),
    };

    // A comment-only YAML document parses to null.
    let value = if value.is_null() {
        Value::Object(Default::default())
    } else {
        value
    };

    info!(path = %path.display(), "Loaded config");
    Ok(value)
}
