//! Context enrichment.
//!
//! Each step is a pure function of the event and the ambient state that
//! returns the sub-trees it wants under its own top-level keys. The enricher
//! runs every step against the same snapshot, then merges the results into
//! `extra` in step order. Built-in steps, in order:
//!
//! | step | keys |
//! |---|---|
//! | `process` | `process` |
//! | `request` | `http`, `url` |
//! | `client` | `client` |
//! | `user_agent` | `user_agent` |
//! | `error` | `error`, `log` |
//!
//! Steps never fail the log call. A pluggable step that returns an error or
//! panics is recorded as `extra.<step name>.error.message`.

pub mod error;
pub mod process;
pub mod request;
pub mod user_agent;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use beatlog_core::{
    Ambient, Contribution, EnrichmentStep, LogError, LogEvent, StepError, UserAgentResolver,
    EXCEPTION_KEY,
};
use serde_json::{json, Map, Value};
use tracing::debug;

pub use error::{throwable_fields, ErrorStep};
pub use process::ProcessStep;
pub use request::{ClientStep, RequestStep};
pub use user_agent::{RegexUserAgentResolver, UserAgentStep};

pub struct ContextEnricher {
    static_fields: Map<String, Value>,
    steps: Vec<Box<dyn EnrichmentStep>>,
}

impl ContextEnricher {
    /// The full built-in chain with the given user-agent resolver.
    pub fn standard(resolver: Arc<dyn UserAgentResolver>) -> Self {
        Self {
            static_fields: Map::new(),
            steps: vec![
                Box::new(ProcessStep),
                Box::new(RequestStep),
                Box::new(ClientStep),
                Box::new(UserAgentStep::new(resolver)),
                Box::new(ErrorStep),
            ],
        }
    }

    /// Process and error enrichment only.
    pub fn without_http() -> Self {
        Self {
            static_fields: Map::new(),
            steps: vec![Box::new(ProcessStep), Box::new(ErrorStep)],
        }
    }

    /// No steps at all; static fields still apply.
    pub fn empty() -> Self {
        Self {
            static_fields: Map::new(),
            steps: Vec::new(),
        }
    }

    /// Fields merged into every record before any step runs.
    pub fn with_static_fields(mut self, fields: Map<String, Value>) -> Self {
        self.static_fields = fields;
        self
    }

    /// Append a step after the existing ones.
    pub fn with_step(mut self, step: Box<dyn EnrichmentStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn enrich(&self, event: &mut LogEvent, ambient: &Ambient) {
        let snapshot: &LogEvent = event;
        let outcomes: Vec<(&str, Result<Contribution, StepError>)> = self
            .steps
            .iter()
            .map(|step| (step.name(), run_step(step.as_ref(), snapshot, ambient)))
            .collect();

        for (key, value) in &self.static_fields {
            merge_into(&mut event.extra, key.clone(), value.clone());
        }

        for (name, outcome) in outcomes {
            match outcome {
                Ok(contribution) => {
                    for (key, value) in contribution.into_map() {
                        merge_into(&mut event.extra, key, value);
                    }
                }
                Err(err) => {
                    let degraded = LogError::EnrichmentDegraded {
                        step: name.to_string(),
                        message: err.to_string(),
                    };
                    debug!(error = %degraded, "Enrichment step degraded");
                    merge_into(
                        &mut event.extra,
                        name.to_string(),
                        json!({ "error": { "message": err.to_string() } }),
                    );
                }
            }
        }

        // Already turned into `error.*`; the raw value must not be serialized.
        event.context.take_throwable(EXCEPTION_KEY);
    }
}

impl Default for ContextEnricher {
    fn default() -> Self {
        Self::standard(Arc::new(RegexUserAgentResolver::new()))
    }
}

fn run_step(
    step: &dyn EnrichmentStep,
    event: &LogEvent,
    ambient: &Ambient,
) -> Result<Contribution, StepError> {
    match panic::catch_unwind(AssertUnwindSafe(|| step.enrich(event, ambient))) {
        Ok(outcome) => outcome,
        Err(payload) => Err(format!("step panicked: {}", panic_message(&*payload)).into()),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

/// Deep merge: objects merge key by key, anything else replaces.
pub(crate) fn merge_into(target: &mut Map<String, Value>, key: String, value: Value) {
    match value {
        Value::Object(incoming) => {
            if let Some(Value::Object(existing)) = target.get_mut(&key) {
                for (k, v) in incoming {
                    merge_into(existing, k, v);
                }
            } else {
                target.insert(key, Value::Object(incoming));
            }
        }
        other => {
            target.insert(key, other);
        }
    }
}
