use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ambient::Ambient;
use crate::error::LogError;
use crate::event::LogEvent;

/// Error a pluggable enrichment step may return. The enricher records it
/// inline instead of propagating it.
pub type StepError = Box<dyn std::error::Error + Send + Sync>;

/// Top-level sub-trees produced by one enrichment step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contribution(Map<String, Value>);

impl Contribution {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// One step of the enrichment chain.
///
/// Steps read the event and ambient state and return what they want merged
/// into `extra`. They must not mutate anything; the enricher merges.
pub trait EnrichmentStep: Send + Sync {
    /// Stable name, also the key a degraded step reports its error under.
    fn name(&self) -> &str;

    fn enrich(&self, event: &LogEvent, ambient: &Ambient) -> Result<Contribution, StepError>;
}

/// Destination for formatted lines.
pub trait Sink: Send {
    /// Append one complete line (already `\n`-terminated).
    fn write(&mut self, line: &[u8]) -> Result<(), LogError>;

    fn flush(&mut self) -> Result<(), LogError>;

    /// Release the handle. Sinks with deferred work (rotation) do it here.
    fn close(&mut self) -> Result<(), LogError> {
        self.flush()
    }

    /// Return to a clean state between units of work.
    fn reset(&mut self) -> Result<(), LogError> {
        self.flush()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn write(&mut self, line: &[u8]) -> Result<(), LogError> {
        (**self).write(line)
    }

    fn flush(&mut self) -> Result<(), LogError> {
        (**self).flush()
    }

    fn close(&mut self) -> Result<(), LogError> {
        (**self).close()
    }

    fn reset(&mut self) -> Result<(), LogError> {
        (**self).reset()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OsInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_minor: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
}

/// Parsed user-agent facets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAgentInfo {
    pub browser: BrowserInfo,
    pub os: OsInfo,
    pub device: DeviceInfo,
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct UserAgentError {
    pub message: String,
}

impl UserAgentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Parses raw user-agent strings. Failures are reported, never raised.
pub trait UserAgentResolver: Send + Sync {
    fn resolve(&self, user_agent: &str) -> Result<UserAgentInfo, UserAgentError>;
}
