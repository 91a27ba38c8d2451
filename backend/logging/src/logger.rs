//! The logger: enrich, format, dispatch.
//!
//! `Logger::log` never fails. Formatting problems degrade the record,
//! sink problems are reported through `tracing` and the call returns.

use std::error::Error as StdError;
use std::sync::Arc;

use beatlog_core::{
    Ambient, Context, EnrichmentStep, LogEvent, LogLevel, OutputStream, ProcessSnapshot,
    RequestContext, Sink, Throwable, UserAgentResolver,
};
use serde_json::{Map, Value};
use tracing::warn;

use crate::enrich::{ContextEnricher, RegexUserAgentResolver};
use crate::format::RecordFormatter;
use crate::sink::StreamSink;

/// Where lines go. Without a secondary sink every line goes to the primary.
pub struct Sinks {
    primary: Box<dyn Sink>,
    secondary: Option<Box<dyn Sink>>,
}

impl Sinks {
    pub fn single(sink: impl Sink + 'static) -> Self {
        Self {
            primary: Box::new(sink),
            secondary: None,
        }
    }

    /// `stdout`-tagged lines to `primary`, `stderr`-tagged lines to `secondary`.
    pub fn split(primary: impl Sink + 'static, secondary: impl Sink + 'static) -> Self {
        Self {
            primary: Box::new(primary),
            secondary: Some(Box::new(secondary)),
        }
    }

    fn for_stream(&mut self, stream: OutputStream) -> &mut dyn Sink {
        match (stream, self.secondary.as_mut()) {
            (OutputStream::Secondary, Some(secondary)) => secondary.as_mut(),
            _ => self.primary.as_mut(),
        }
    }

    fn each<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn Sink),
    {
        f(self.primary.as_mut());
        if let Some(secondary) = self.secondary.as_mut() {
            f(secondary.as_mut());
        }
    }
}

impl Default for Sinks {
    fn default() -> Self {
        Self::single(StreamSink::stdout())
    }
}

pub struct Logger {
    channel: String,
    min_level: LogLevel,
    enricher: ContextEnricher,
    formatter: RecordFormatter,
    ambient: Ambient,
    sinks: Sinks,
}

impl Logger {
    pub fn builder(channel: impl Into<String>) -> LoggerBuilder {
        LoggerBuilder::new(channel)
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    pub fn ambient(&self) -> &Ambient {
        &self.ambient
    }

    pub fn log(&mut self, level: LogLevel, message: impl Into<String>, context: Context) {
        if level < self.min_level {
            return;
        }

        let mut event = LogEvent::new(level, self.channel.clone(), message, context);
        self.enricher.enrich(&mut event, &self.ambient);

        let line = match self.formatter.format(&event) {
            Ok(line) => line,
            Err(err) => match self.formatter.format_degraded(&event) {
                Ok((line, dropped)) => {
                    warn!(
                        channel = %self.channel,
                        error = %err,
                        dropped = ?dropped,
                        "Dropped unserializable context fields"
                    );
                    line
                }
                Err(err) => {
                    warn!(channel = %self.channel, error = %err, "Log record could not be encoded");
                    return;
                }
            },
        };

        let stream = line.stream();
        if let Err(e) = self.sinks.for_stream(stream).write(line.as_bytes()) {
            warn!(channel = %self.channel, stream = %stream, error = %e, "Failed to write log line");
        }
    }

    pub fn debug(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Debug, message, context);
    }

    pub fn info(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Info, message, context);
    }

    pub fn notice(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Notice, message, context);
    }

    pub fn warning(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Warning, message, context);
    }

    pub fn error(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Error, message, context);
    }

    pub fn critical(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Critical, message, context);
    }

    pub fn alert(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Alert, message, context);
    }

    pub fn emergency(&mut self, message: impl Into<String>, context: Context) {
        self.log(LogLevel::Emergency, message, context);
    }

    /// Log a captured error. The message is the throwable's message, or a
    /// synthesized one when it is empty.
    pub fn log_throwable(&mut self, throwable: Throwable, level: LogLevel) {
        let message = throwable.display_message();
        self.log(level, message, Context::new().with_exception(throwable));
    }

    pub fn critical_throwable(&mut self, throwable: Throwable) {
        self.log_throwable(throwable, LogLevel::Critical);
    }

    /// Capture `err` at the call site and log it.
    #[track_caller]
    pub fn log_error<E>(&mut self, err: &E, level: LogLevel)
    where
        E: StdError + ?Sized,
    {
        let throwable = Throwable::from_error(err);
        self.log_throwable(throwable, level);
    }

    /// Replace the ambient request, e.g. at the start of a new request.
    pub fn set_request_context(&mut self, request: RequestContext) {
        self.ambient.request = request;
    }

    pub fn clear_request_context(&mut self) {
        self.ambient.request = RequestContext::none();
    }

    pub fn flush(&mut self) {
        let channel = &self.channel;
        self.sinks.each(|sink| {
            if let Err(e) = sink.flush() {
                warn!(channel = %channel, error = %e, "Failed to flush log sink");
            }
        });
    }

    /// Close every sink, running any pending rotation.
    pub fn close(&mut self) {
        let channel = &self.channel;
        self.sinks.each(|sink| {
            if let Err(e) = sink.close() {
                warn!(channel = %channel, error = %e, "Failed to close log sink");
            }
        });
    }

    /// Reset every sink between units of work.
    pub fn reset(&mut self) {
        let channel = &self.channel;
        self.sinks.each(|sink| {
            if let Err(e) = sink.reset() {
                warn!(channel = %channel, error = %e, "Failed to reset log sink");
            }
        });
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        self.flush();
    }
}

pub struct LoggerBuilder {
    channel: String,
    min_level: LogLevel,
    http_context: bool,
    enricher: Option<ContextEnricher>,
    resolver: Option<Arc<dyn UserAgentResolver>>,
    static_fields: Map<String, Value>,
    steps: Vec<Box<dyn EnrichmentStep>>,
    process: Option<ProcessSnapshot>,
    request: RequestContext,
    sinks: Option<Sinks>,
}

impl LoggerBuilder {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            min_level: LogLevel::Debug,
            http_context: true,
            enricher: None,
            resolver: None,
            static_fields: Map::new(),
            steps: Vec::new(),
            process: None,
            request: RequestContext::none(),
            sinks: None,
        }
    }

    /// Send every line to `sink`.
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sinks = Some(Sinks::single(sink));
        self
    }

    pub fn split(mut self, primary: impl Sink + 'static, secondary: impl Sink + 'static) -> Self {
        self.sinks = Some(Sinks::split(primary, secondary));
        self
    }

    pub fn sinks(mut self, sinks: Sinks) -> Self {
        self.sinks = Some(sinks);
        self
    }

    /// Use a fully custom enricher. Overrides `http_context`,
    /// `user_agent_resolver`, `static_fields` and `step`.
    pub fn enricher(mut self, enricher: ContextEnricher) -> Self {
        self.enricher = Some(enricher);
        self
    }

    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Include the request, client and user-agent steps. On by default.
    pub fn http_context(mut self, enabled: bool) -> Self {
        self.http_context = enabled;
        self
    }

    pub fn user_agent_resolver(mut self, resolver: Arc<dyn UserAgentResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn static_fields(mut self, fields: Map<String, Value>) -> Self {
        self.static_fields = fields;
        self
    }

    /// Append a custom step after the built-in ones.
    pub fn step(mut self, step: impl EnrichmentStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn process_snapshot(mut self, process: ProcessSnapshot) -> Self {
        self.process = Some(process);
        self
    }

    pub fn request_context(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    pub fn build(self) -> Logger {
        let enricher = match self.enricher {
            Some(enricher) => enricher,
            None => {
                let base = if self.http_context {
                    let resolver = self
                        .resolver
                        .unwrap_or_else(|| Arc::new(RegexUserAgentResolver::new()));
                    ContextEnricher::standard(resolver)
                } else {
                    ContextEnricher::without_http()
                };
                self.steps
                    .into_iter()
                    .fold(base.with_static_fields(self.static_fields), |e, step| {
                        e.with_step(step)
                    })
            }
        };

        Logger {
            channel: self.channel,
            min_level: self.min_level,
            enricher,
            formatter: RecordFormatter::new(),
            ambient: Ambient::new(
                self.process.unwrap_or_else(ProcessSnapshot::capture),
                self.request,
            ),
            sinks: self.sinks.unwrap_or_default(),
        }
    }
}
