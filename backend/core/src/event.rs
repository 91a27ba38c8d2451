use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::level::LogLevel;
use crate::throwable::Throwable;

/// Context key the error enrichment step looks at.
pub const EXCEPTION_KEY: &str = "exception";

type DeferredFn = dyn Fn() -> Result<Value, serde_json::Error> + Send + Sync;

/// A caller-supplied context value.
#[derive(Clone)]
pub enum ContextValue {
    /// Plain JSON.
    Json(Value),
    /// A raw error value. Turned into `error.*` fields, never serialized.
    Throwable(Throwable),
    /// A value serialized only when the record is formatted. Serialization
    /// may fail, which is how a record ends up with a `FormatError`.
    Deferred(Arc<DeferredFn>),
}

impl ContextValue {
    pub fn deferred<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        ContextValue::Deferred(Arc::new(move || serde_json::to_value(&value)))
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ContextValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_throwable(&self) -> Option<&Throwable> {
        match self {
            ContextValue::Throwable(t) => Some(t),
            _ => None,
        }
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ContextValue::Throwable(t) => f.debug_tuple("Throwable").field(t).finish(),
            ContextValue::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<Value> for ContextValue {
    fn from(value: Value) -> Self {
        ContextValue::Json(value)
    }
}

impl From<Throwable> for ContextValue {
    fn from(value: Throwable) -> Self {
        ContextValue::Throwable(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Json(Value::String(value.to_string()))
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Json(Value::String(value))
    }
}

/// Ordered key → value mapping supplied by the caller of `log`.
///
/// Inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct Context {
    entries: Vec<(String, ContextValue)>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn with_exception(self, throwable: Throwable) -> Self {
        self.with(EXCEPTION_KEY, throwable)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Insert a value whose serialization is deferred to format time.
    pub fn insert_serialize<T>(&mut self, key: impl Into<String>, value: T)
    where
        T: Serialize + Send + Sync + 'static,
    {
        self.insert(key, ContextValue::deferred(value));
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// The throwable stored under `key`, if that entry is one.
    pub fn throwable(&self, key: &str) -> Option<&Throwable> {
        self.get(key).and_then(ContextValue::as_throwable)
    }

    /// Remove `key` only when it holds a throwable.
    pub fn take_throwable(&mut self, key: &str) -> Option<Throwable> {
        self.throwable(key)?;
        match self.remove(key) {
            Some(ContextValue::Throwable(t)) => Some(t),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<Map<String, Value>> for Context {
    fn from(map: Map<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Context
where
    K: Into<String>,
    V: Into<ContextValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut context = Context::new();
        for (k, v) in iter {
            context.insert(k, v);
        }
        context
    }
}

/// One log call on its way through the pipeline.
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub channel: String,
    pub message: String,
    pub context: Context,
    /// Pipeline-supplied fields, filled by the enricher.
    pub extra: Map<String, Value>,
}

impl LogEvent {
    pub fn new(
        level: LogLevel,
        channel: impl Into<String>,
        message: impl Into<String>,
        context: Context,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            channel: channel.into(),
            message: message.into(),
            context,
            extra: Map::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
