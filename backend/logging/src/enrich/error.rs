use beatlog_core::{
    Ambient, Contribution, EnrichmentStep, LogEvent, StepError, Throwable, EXCEPTION_KEY,
};
use serde_json::json;

/// ECS `error.*` and `log.origin.*` fields for a captured throwable.
pub fn throwable_fields(throwable: &Throwable) -> Contribution {
    Contribution::none()
        .with(
            "error",
            json!({
                "type": throwable.type_name(),
                "message": throwable.display_message(),
                "stack_trace": throwable.stack_trace(),
                "code": throwable.code(),
            }),
        )
        .with(
            "log",
            json!({
                "origin": {
                    "file": {
                        "name": throwable.file(),
                        "line": throwable.line(),
                    }
                }
            }),
        )
}

/// Turns `context.exception` into error fields. Contributes nothing when the
/// key is absent or holds a plain value.
pub struct ErrorStep;

impl EnrichmentStep for ErrorStep {
    fn name(&self) -> &str {
        "error"
    }

    fn enrich(&self, event: &LogEvent, _ambient: &Ambient) -> Result<Contribution, StepError> {
        Ok(event
            .context
            .throwable(EXCEPTION_KEY)
            .map(throwable_fields)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatlog_core::{Context, LogLevel};
    use serde_json::json;

    #[test]
    fn maps_throwable_to_ecs_fields() {
        let t = Throwable::new("QueryError", "deadlock detected")
            .with_code(40001)
            .with_origin("src/orders/repo.rs", 88)
            .with_stack_trace("#0 caused by: lock wait timeout");
        let event = LogEvent::new(
            LogLevel::Error,
            "db",
            "write failed",
            Context::new().with_exception(t),
        );
        let c = ErrorStep.enrich(&event, &Ambient::default()).unwrap();
        assert_eq!(
            c.get("error"),
            Some(&json!({
                "type": "QueryError",
                "message": "deadlock detected",
                "stack_trace": "#0 caused by: lock wait timeout",
                "code": "40001"
            }))
        );
        assert_eq!(
            c.get("log"),
            Some(&json!({"origin": {"file": {"name": "src/orders/repo.rs", "line": 88}}}))
        );
    }

    #[test]
    fn plain_exception_value_is_ignored() {
        let event = LogEvent::new(
            LogLevel::Error,
            "db",
            "x",
            Context::new().with(EXCEPTION_KEY, "just a string"),
        );
        assert!(ErrorStep.enrich(&event, &Ambient::default()).unwrap().is_empty());
    }
}
