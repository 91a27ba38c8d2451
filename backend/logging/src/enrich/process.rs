use beatlog_core::{Ambient, Contribution, EnrichmentStep, LogEvent, StepError};
use serde::Serialize;

/// ECS `process.*` fields.
#[derive(Debug, Serialize)]
struct ProcessFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    pid: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    executable: Option<String>,
    args_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    command_line: Option<String>,
}

/// Runtime identity of the logging process. Always contributes.
pub struct ProcessStep;

impl EnrichmentStep for ProcessStep {
    fn name(&self) -> &str {
        "process"
    }

    fn enrich(&self, _event: &LogEvent, ambient: &Ambient) -> Result<Contribution, StepError> {
        let process = &ambient.process;
        let fields = ProcessFields {
            name: process.name(),
            pid: process.pid,
            executable: process.executable.clone(),
            args_count: process.args.len(),
            command_line: process.command_line(),
        };
        Ok(Contribution::none().with("process", serde_json::to_value(fields)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatlog_core::{Context, LogLevel, ProcessSnapshot, RequestContext};
    use serde_json::json;

    #[test]
    fn emits_process_identity() {
        let ambient = Ambient::new(
            ProcessSnapshot {
                pid: 4242,
                executable: Some("/opt/shop/bin/queue-worker".into()),
                args: vec!["queue-worker".into(), "--tries=3".into()],
            },
            RequestContext::none(),
        );
        let event = LogEvent::new(LogLevel::Info, "jobs", "started", Context::new());
        let c = ProcessStep.enrich(&event, &ambient).unwrap();
        assert_eq!(
            c.get("process"),
            Some(&json!({
                "name": "queue-worker",
                "pid": 4242,
                "executable": "/opt/shop/bin/queue-worker",
                "args_count": 2,
                "command_line": "queue-worker --tries=3"
            }))
        );
    }

    #[test]
    fn empty_snapshot_still_contributes() {
        let event = LogEvent::new(LogLevel::Debug, "x", "y", Context::new());
        let c = ProcessStep.enrich(&event, &Ambient::default()).unwrap();
        assert_eq!(c.get("process"), Some(&json!({"pid": 0, "args_count": 0})));
    }
}
