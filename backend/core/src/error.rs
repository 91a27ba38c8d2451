use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the beatlog pipeline.
///
/// Only `InvalidConfiguration` (and `Io` while opening a destination) ever
/// escapes to callers, and only from constructors. Everything else is caught
/// inside `Logger::log` and reported through `tracing`.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("enrichment step '{step}' degraded: {message}")]
    EnrichmentDegraded { step: String, message: String },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Rotation(#[from] RotationError),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LogError {
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// A single record could not be serialized.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("context field '{field}' could not be serialized: {source}")]
    Field {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("record could not be encoded: {0}")]
    Encode(#[source] serde_json::Error),
}

impl FormatError {
    /// Name of the offending context field, if the failure is field-local.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Field { field, .. } => Some(field),
            Self::Encode(_) => None,
        }
    }
}

/// A rename in the generation chain failed.
#[derive(Debug, Error)]
#[error("failed to rotate {from} -> {to}: {source}")]
pub struct RotationError {
    pub from: PathBuf,
    pub to: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_is_exposed_for_field_errors_only() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = FormatError::Field {
            field: "payload".into(),
            source,
        };
        assert_eq!(err.field(), Some("payload"));

        let source = serde_json::from_str::<serde_json::Value>("[").unwrap_err();
        assert_eq!(FormatError::Encode(source).field(), None);
    }

    #[test]
    fn rotation_error_converts_into_log_error() {
        let err: LogError = RotationError {
            from: "app.log".into(),
            to: "app.log.1".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .into();
        assert!(err.to_string().starts_with("failed to rotate app.log -> app.log.1"));
    }
}
