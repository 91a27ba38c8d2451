//! ECS JSON line formatter.
//!
//! One event becomes one compact JSON object terminated by a single `\n`.
//! Fixed fields come first, then `extra`, then `context`. A later source
//! overwrites an earlier one in place, so key order stays stable. `stream`
//! is always written last and cannot be overridden.

use std::panic::{self, AssertUnwindSafe};

use beatlog_core::{ContextValue, FormatError, LogEvent, OutputStream};
use serde::ser::Error as _;
use serde_json::{Map, Value};

use crate::enrich::panic_message;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const STREAM_KEY: &str = "stream";

/// A rendered record and the stream it belongs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    line: String,
    stream: OutputStream,
}

impl FormattedLine {
    pub fn as_str(&self) -> &str {
        &self.line
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.line.as_bytes()
    }

    pub fn stream(&self) -> OutputStream {
        self.stream
    }

    pub fn into_string(self) -> String {
        self.line
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RecordFormatter;

impl RecordFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Render one event. Fails only when a deferred context value cannot be
    /// serialized.
    pub fn format(&self, event: &LogEvent) -> Result<FormattedLine, FormatError> {
        let record = self.record(event, |field, source| {
            Err(FormatError::Field {
                field: field.to_string(),
                source,
            })
        })?;
        self.finish(record, event)
    }

    /// Render one event, dropping context fields that fail to serialize.
    /// Returns the line and the names of the dropped fields.
    pub fn format_degraded(
        &self,
        event: &LogEvent,
    ) -> Result<(FormattedLine, Vec<String>), FormatError> {
        let mut dropped = Vec::new();
        let record = self.record(event, |field, _| {
            dropped.push(field.to_string());
            Ok(())
        })?;
        Ok((self.finish(record, event)?, dropped))
    }

    /// Format each event independently and concatenate the lines.
    pub fn format_batch(&self, events: &[LogEvent]) -> Result<String, FormatError> {
        events
            .iter()
            .map(|event| self.format(event).map(FormattedLine::into_string))
            .collect()
    }

    fn record<F>(
        &self,
        event: &LogEvent,
        mut on_error: F,
    ) -> Result<Map<String, Value>, FormatError>
    where
        F: FnMut(&str, serde_json::Error) -> Result<(), FormatError>,
    {
        let mut record = Map::new();
        record.insert(
            "@timestamp".into(),
            Value::String(event.timestamp.format(TIMESTAMP_FORMAT).to_string()),
        );
        record.insert("log.level".into(), event.level.name().into());
        record.insert("log.channel".into(), event.channel.clone().into());
        record.insert("message".into(), event.message.clone().into());
        record.insert("log.severity".into(), event.level.syslog_severity().into());

        for (key, value) in &event.extra {
            if key != STREAM_KEY {
                record.insert(key.clone(), value.clone());
            }
        }

        for (key, value) in event.context.iter() {
            if key == STREAM_KEY {
                continue;
            }
            match value {
                ContextValue::Json(v) => {
                    record.insert(key.to_string(), v.clone());
                }
                ContextValue::Throwable(_) => {}
                ContextValue::Deferred(serialize) => match evaluate(serialize.as_ref()) {
                    Ok(v) => {
                        record.insert(key.to_string(), v);
                    }
                    Err(source) => on_error(key, source)?,
                },
            }
        }

        Ok(record)
    }

    fn finish(
        &self,
        mut record: Map<String, Value>,
        event: &LogEvent,
    ) -> Result<FormattedLine, FormatError> {
        let stream = event.level.stream();
        record.insert(STREAM_KEY.into(), stream.as_str().into());

        let mut line = serde_json::to_string(&record).map_err(FormatError::Encode)?;
        line.push('\n');
        Ok(FormattedLine { line, stream })
    }
}

/// Run a deferred serializer. A panic counts as a serialization error.
fn evaluate(
    serialize: &(dyn Fn() -> Result<Value, serde_json::Error> + Send + Sync),
) -> Result<Value, serde_json::Error> {
    panic::catch_unwind(AssertUnwindSafe(serialize)).unwrap_or_else(|payload| {
        Err(serde_json::Error::custom(format!(
            "serializer panicked: {}",
            panic_message(&*payload)
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use beatlog_core::{Context, LogLevel, Throwable};
    use chrono::{TimeZone, Utc};
    use serde::{Serialize, Serializer};
    use serde_json::json;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("handle is not serializable"))
        }
    }

    struct Exploding;

    impl Serialize for Exploding {
        fn serialize<S: Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            panic!("lock poisoned")
        }
    }

    fn event(level: LogLevel, context: Context) -> LogEvent {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + chrono::Duration::microseconds(42_017);
        LogEvent::new(level, "billing", "invoice sent", context).at(ts)
    }

    fn parse(line: &FormattedLine) -> Value {
        serde_json::from_str(line.as_str()).unwrap()
    }

    #[test]
    fn fixed_fields_come_first() {
        let line = RecordFormatter::new()
            .format(&event(LogLevel::Info, Context::new()))
            .unwrap();
        assert_eq!(
            line.as_str(),
            "{\"@timestamp\":\"2024-03-09T14:05:07.042017Z\",\"log.level\":\"INFO\",\
             \"log.channel\":\"billing\",\"message\":\"invoice sent\",\"log.severity\":6,\
             \"stream\":\"stdout\"}\n"
        );
        assert_eq!(line.stream(), OutputStream::Primary);
    }

    #[test]
    fn formatting_is_idempotent() {
        let e = event(LogLevel::Warning, Context::new().with("order", json!({"id": 7})));
        let f = RecordFormatter::new();
        assert_eq!(f.format(&e).unwrap(), f.format(&e).unwrap());
    }

    #[test]
    fn stream_splits_above_notice() {
        let f = RecordFormatter::new();
        for level in LogLevel::ALL {
            let line = f.format(&event(level, Context::new())).unwrap();
            let expected = if level > LogLevel::Notice { "stderr" } else { "stdout" };
            assert_eq!(parse(&line)["stream"], expected, "{level}");
            assert_eq!(parse(&line)["log.severity"], level.syslog_severity());
        }
    }

    #[test]
    fn context_wins_over_extra_and_stream_is_fixed() {
        let mut e = event(
            LogLevel::Error,
            Context::new()
                .with("labels", json!({"from": "context"}))
                .with("stream", "stdout"),
        );
        e.extra.insert("labels".into(), json!({"from": "extra"}));
        e.extra.insert("process".into(), json!({"pid": 1}));
        let v = parse(&RecordFormatter::new().format(&e).unwrap());
        assert_eq!(v["labels"], json!({"from": "context"}));
        assert_eq!(v["process"]["pid"], 1);
        assert_eq!(v["stream"], "stderr");
    }

    #[test]
    fn raw_throwable_is_never_serialized() {
        let e = event(
            LogLevel::Critical,
            Context::new().with("cause", Throwable::new("IoError", "disk full")),
        );
        let v = parse(&RecordFormatter::new().format(&e).unwrap());
        assert!(v.get("cause").is_none());
    }

    #[test]
    fn failing_field_is_a_format_error_and_degrades() {
        let mut ctx = Context::new().with("tenant", "acme");
        ctx.insert_serialize("handle", Unserializable);
        let e = event(LogLevel::Info, ctx);
        let f = RecordFormatter::new();

        let err = f.format(&e).unwrap_err();
        assert_eq!(err.field(), Some("handle"));

        let (line, dropped) = f.format_degraded(&e).unwrap();
        assert_eq!(dropped, vec!["handle".to_string()]);
        let v = parse(&line);
        assert_eq!(v["tenant"], "acme");
        assert!(v.get("handle").is_none());
    }

    #[test]
    fn panicking_field_is_a_format_error_and_degrades() {
        let mut ctx = Context::new().with("tenant", "acme");
        ctx.insert_serialize("pool", Exploding);
        let e = event(LogLevel::Info, ctx);
        let f = RecordFormatter::new();

        let err = f.format(&e).unwrap_err();
        assert_eq!(err.field(), Some("pool"));
        assert!(err.to_string().contains("lock poisoned"));

        let (line, dropped) = f.format_degraded(&e).unwrap();
        assert_eq!(dropped, vec!["pool".to_string()]);
        assert_eq!(parse(&line)["tenant"], "acme");
    }

    #[test]
    fn batch_is_per_record() {
        let f = RecordFormatter::new();
        let events = vec![
            event(LogLevel::Debug, Context::new()),
            event(LogLevel::Alert, Context::new()),
        ];
        let out = f.format_batch(&events).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(out.ends_with('\n'));
        assert_eq!(format!("{}\n", lines[1]), f.format(&events[1]).unwrap().into_string());
    }
}
