//! Builder for ECS-shaped context values.
//!
//! ```
//! use beatlog::ecs::{Ecs, EventCategory, EventFields, EventOutcome};
//!
//! let context = Ecs::new()
//!     .with_event(EventFields::new(
//!         "user-login",
//!         vec![EventCategory::Authentication],
//!         "shop.auth",
//!         EventOutcome::Success,
//!     ))
//!     .into_context();
//! assert!(context.get("event").is_some());
//! ```

use beatlog_core::{Context, Throwable};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::enrich::{merge_into, throwable_fields};

/// Allowed values of ECS `event.category`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Api,
    Authentication,
    Configuration,
    Database,
    Driver,
    Email,
    File,
    Host,
    Iam,
    IntrusionDetection,
    Library,
    Malware,
    Network,
    Package,
    Process,
    Registry,
    Session,
    Threat,
    Vulnerability,
    Web,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    Success,
    Failure,
    Unknown,
}

/// ECS `event.*` fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFields {
    pub action: String,
    pub category: Vec<EventCategory>,
    pub dataset: String,
    pub outcome: EventOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Nanoseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl EventFields {
    pub fn new(
        action: impl Into<String>,
        category: Vec<EventCategory>,
        dataset: impl Into<String>,
        outcome: EventOutcome,
    ) -> Self {
        Self {
            action: action.into(),
            category,
            dataset: dataset.into(),
            outcome,
            created: None,
            code: None,
            duration: None,
            id: None,
            reason: None,
        }
    }

    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created = Some(at.to_rfc3339_opts(SecondsFormat::Secs, true));
        self
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn duration(mut self, nanos: u64) -> Self {
        self.duration = Some(nanos);
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ecs {
    data: Map<String, Value>,
}

impl Ecs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `error.*` and `log.origin.*` for `throwable`.
    pub fn with_throwable(mut self, throwable: &Throwable) -> Self {
        for (key, value) in throwable_fields(throwable).into_map() {
            self.data.insert(key, value);
        }
        self
    }

    /// Add `event.*`. Repeated calls merge into the same `event` object.
    pub fn with_event(mut self, event: EventFields) -> Self {
        if let Ok(value) = serde_json::to_value(event) {
            merge_into(&mut self.data, "event".to_string(), value);
        }
        self
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.data
    }

    pub fn into_context(self) -> Context {
        Context::from(self.data)
    }
}
