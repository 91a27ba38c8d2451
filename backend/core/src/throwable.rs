//! Captured error values carried through a log call.
//!
//! A `Throwable` is what the error enrichment step turns into ECS `error.*`
//! and `log.origin.*` fields. It is never serialized directly.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Throwable {
    type_name: String,
    message: String,
    code: String,
    file: String,
    line: u32,
    stack_trace: String,
}

impl Throwable {
    /// Build a throwable by hand. The origin is the caller's location.
    #[track_caller]
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            type_name: type_name.into(),
            message: message.into(),
            code: "0".to_string(),
            file: location.file().to_string(),
            line: location.line(),
            stack_trace: String::new(),
        }
    }

    /// Capture an error value. The origin is the caller's location and the
    /// stack trace is the `source()` chain followed by a backtrace, when
    /// backtraces are enabled for the process.
    #[track_caller]
    pub fn from_error<E>(err: &E) -> Self
    where
        E: StdError + ?Sized,
    {
        let mut throwable = Self::new(short_type_name::<E>(), err.to_string());

        let mut trace = Vec::new();
        let mut source = err.source();
        let mut depth = 0;
        while let Some(cause) = source {
            trace.push(format!("#{depth} caused by: {cause}"));
            source = cause.source();
            depth += 1;
        }

        let backtrace = Backtrace::capture();
        if backtrace.status() == BacktraceStatus::Captured {
            trace.push(backtrace.to_string());
        }
        throwable.stack_trace = trace.join("\n");
        throwable
    }

    pub fn with_code(mut self, code: impl ToString) -> Self {
        self.code = code.to_string();
        self
    }

    pub fn with_origin(mut self, file: impl Into<String>, line: u32) -> Self {
        self.file = file.into();
        self.line = line;
        self
    }

    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = stack_trace.into();
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The raw message, possibly empty.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The message to report: never empty.
    pub fn display_message(&self) -> String {
        if self.message.is_empty() {
            format!("{} thrown with empty message", self.type_name)
        } else {
            self.message.clone()
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn stack_trace(&self) -> &str {
        &self.stack_trace
    }
}

impl fmt::Display for Throwable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.type_name, self.display_message())
    }
}

/// `std::any::type_name` without the module path, keeping generic arguments.
fn short_type_name<E: ?Sized>() -> String {
    let full = std::any::type_name::<E>();
    let base_end = full.find('<').unwrap_or(full.len());
    let base = &full[..base_end];
    let start = base.rfind("::").map(|i| i + 2).unwrap_or(0);
    full[start..].to_string()
}
