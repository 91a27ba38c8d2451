//! `beatlog-core`: shared types for the beatlog ECS logging pipeline.
//!
//! Provides:
//! - Log levels, syslog severities and the stdout/stderr stream split
//! - `LogEvent` and the ordered caller `Context`
//! - `Throwable`, a captured error value for ECS `error.*` fields
//! - Explicit ambient state (`RequestContext`, `ProcessSnapshot`)
//! - The `Sink`, `EnrichmentStep` and `UserAgentResolver` seams
//! - Rotation bounds and generation naming
//! - The error taxonomy

pub mod ambient;
pub mod error;
pub mod event;
pub mod level;
pub mod rotation;
pub mod throwable;
pub mod traits;

pub use ambient::{Ambient, ProcessSnapshot, RequestContext};
pub use error::{FormatError, LogError, LogResult, RotationError};
pub use event::{Context, ContextValue, LogEvent, EXCEPTION_KEY};
pub use level::{LogLevel, OutputStream, ParseLevelError};
pub use rotation::{GenerationNaming, RotationPolicy};
pub use throwable::Throwable;
pub use traits::{
    BrowserInfo, Contribution, DeviceInfo, EnrichmentStep, OsInfo, Sink, StepError,
    UserAgentError, UserAgentInfo, UserAgentResolver,
};
