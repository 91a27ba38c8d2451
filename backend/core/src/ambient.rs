//! Ambient state read by enrichment steps.
//!
//! Nothing here touches process globals on its own: a `RequestContext` is
//! built explicitly by whoever owns the request, and `ProcessSnapshot` is
//! captured once when the logger is built.

use std::collections::BTreeMap;
use std::path::Path;

/// The in-flight HTTP request, if any.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    method: Option<String>,
    uri: Option<String>,
    remote_addr: Option<String>,
    headers: BTreeMap<String, String>,
}

impl RequestContext {
    /// No request in flight (CLI jobs, workers, tests).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn http(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: Some(method.into()),
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.headers.insert(k.as_ref().to_ascii_lowercase(), v.into());
        }
        self
    }

    /// Build from CGI-style variables (`REQUEST_METHOD`, `REQUEST_URI`,
    /// `REMOTE_ADDR`, `HTTP_*`). Pass `std::env::vars()` in a CGI process.
    pub fn from_cgi_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut ctx = Self::default();
        for (k, v) in vars {
            let key = k.as_ref();
            match key {
                "REQUEST_METHOD" => ctx.method = Some(v.into()),
                "REQUEST_URI" => ctx.uri = Some(v.into()),
                "REMOTE_ADDR" => ctx.remote_addr = Some(v.into()),
                _ => {
                    if let Some(name) = key.strip_prefix("HTTP_") {
                        let name = name.to_ascii_lowercase().replace('_', "-");
                        ctx.headers.insert(name, v.into());
                    }
                }
            }
        }
        ctx
    }

    /// A request counts as HTTP once it has a method.
    pub fn is_http(&self) -> bool {
        self.method.is_some()
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn remote_addr(&self) -> Option<&str> {
        self.remote_addr.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Identity of the running process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub executable: Option<String>,
    pub args: Vec<String>,
}

impl ProcessSnapshot {
    pub fn capture() -> Self {
        Self {
            pid: std::process::id(),
            executable: std::env::current_exe()
                .ok()
                .map(|p| p.display().to_string()),
            args: std::env::args().collect(),
        }
    }

    /// Executable file name, falling back to `argv[0]`.
    pub fn name(&self) -> Option<String> {
        self.executable
            .as_deref()
            .or_else(|| self.args.first().map(String::as_str))
            .and_then(|p| Path::new(p).file_name())
            .map(|n| n.to_string_lossy().into_owned())
    }

    pub fn command_line(&self) -> Option<String> {
        if self.args.is_empty() {
            None
        } else {
            Some(self.args.join(" "))
        }
    }
}

/// Everything an enrichment step may read besides the event itself.
#[derive(Debug, Clone, Default)]
pub struct Ambient {
    pub process: ProcessSnapshot,
    pub request: RequestContext,
}

impl Ambient {
    pub fn new(process: ProcessSnapshot, request: RequestContext) -> Self {
        Self { process, request }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_not_http() {
        assert!(!RequestContext::none().is_http());
        assert!(RequestContext::http("GET", "/").is_http());
    }

    #[test]
    fn headers_are_case_insensitive() {
        let ctx = RequestContext::http("GET", "/").with_header("CF-Ray", "8a1b");
        assert_eq!(ctx.header("cf-ray"), Some("8a1b"));
        assert_eq!(ctx.header("CF-RAY"), Some("8a1b"));
    }

    #[test]
    fn cgi_vars_map_to_headers() {
        let ctx = RequestContext::from_cgi_vars([
            ("REQUEST_METHOD", "POST"),
            ("REQUEST_URI", "/checkout?step=2"),
            ("REMOTE_ADDR", "10.0.0.7"),
            ("HTTP_X_FORWARDED_FOR", "203.0.113.9"),
            ("HTTP_CF_CONNECTING_IP", "198.51.100.4"),
            ("PATH", "/usr/bin"),
        ]);
        assert_eq!(ctx.method(), Some("POST"));
        assert_eq!(ctx.uri(), Some("/checkout?step=2"));
        assert_eq!(ctx.remote_addr(), Some("10.0.0.7"));
        assert_eq!(ctx.header("x-forwarded-for"), Some("203.0.113.9"));
        assert_eq!(ctx.header("cf-connecting-ip"), Some("198.51.100.4"));
        assert_eq!(ctx.header("path"), None);
    }

    #[test]
    fn process_name_and_command_line() {
        let snapshot = ProcessSnapshot {
            pid: 42,
            executable: Some("/usr/local/bin/worker".into()),
            args: vec!["worker".into(), "--queue".into(), "mail".into()],
        };
        assert_eq!(snapshot.name().as_deref(), Some("worker"));
        assert_eq!(snapshot.command_line().as_deref(), Some("worker --queue mail"));
        assert_eq!(ProcessSnapshot::default().command_line(), None);
    }
}
