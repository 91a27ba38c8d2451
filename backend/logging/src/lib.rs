//! ECS-shaped JSON log lines for log shippers.
//!
//! A `Logger` turns each call into exactly one JSON line:
//!
//! 1. the `ContextEnricher` adds process, request, client, user-agent and
//!    error fields to the record,
//! 2. the `RecordFormatter` renders the ECS line and tags it `stdout` or
//!    `stderr` by severity,
//! 3. the line is written to the matching sink, optionally a size-rotated
//!    file.
//!
//! Logging never fails the caller. Problems inside the pipeline are reported
//! through `tracing`; see [`diagnostics::init_diagnostics`].

pub mod diagnostics;
pub mod ecs;
pub mod enrich;
pub mod factory;
pub mod format;
pub mod logger;
pub mod sink;

pub use beatlog_core::{
    Ambient, Context, ContextValue, EnrichmentStep, LogError, LogLevel, LogResult, OutputStream,
    ProcessSnapshot, RequestContext, RotationPolicy, Sink, Throwable, UserAgentResolver,
    EXCEPTION_KEY,
};
pub use diagnostics::init_diagnostics;
pub use ecs::{Ecs, EventCategory, EventFields, EventOutcome};
pub use enrich::{ContextEnricher, RegexUserAgentResolver};
pub use factory::{
    build_logger, logger_from_config_dir, logger_from_default_config, logger_from_file,
    logger_from_map,
};
pub use format::{FormattedLine, RecordFormatter};
pub use logger::{Logger, LoggerBuilder, Sinks};
pub use sink::{MemorySink, RotatingFileSink, StreamSink};
