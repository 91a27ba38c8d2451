//! `user_agent.*` enrichment and the default regex resolver.

use std::sync::Arc;

use beatlog_core::{
    Ambient, BrowserInfo, Contribution, DeviceInfo, EnrichmentStep, LogEvent, OsInfo, StepError,
    Throwable, UserAgentError, UserAgentInfo, UserAgentResolver,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::json;

const DEFAULT_MAX_LENGTH: usize = 1024;

/// First match wins, so more specific tokens come first.
static BROWSERS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Googlebot/(\d+)(?:\.(\d+))?", "Googlebot"),
        (r"Edg(?:e|A|iOS)?/(\d+)(?:\.(\d+))?(?:\.(\d+))?", "Edge"),
        (r"OPR/(\d+)(?:\.(\d+))?(?:\.(\d+))?", "Opera"),
        (r"SamsungBrowser/(\d+)(?:\.(\d+))?", "Samsung Internet"),
        (r"(?:Chrome|CriOS)/(\d+)(?:\.(\d+))?(?:\.(\d+))?", "Chrome"),
        (r"(?:Firefox|FxiOS)/(\d+)(?:\.(\d+))?(?:\.(\d+))?", "Firefox"),
        (r"Version/(\d+)(?:\.(\d+))?(?:\.(\d+))?.*Mobile.*Safari/", "Mobile Safari"),
        (r"Version/(\d+)(?:\.(\d+))?(?:\.(\d+))?.*Safari/", "Safari"),
        (r"curl/(\d+)(?:\.(\d+))?(?:\.(\d+))?", "curl"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).expect("static regex"), name))
    .collect()
});

static OPERATING_SYSTEMS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"Windows NT (\d+)\.(\d+)", "Windows"),
        (r"(?:iPhone|CPU) OS (\d+)_(\d+)(?:_(\d+))?(?:_(\d+))?", "iOS"),
        (r"Mac OS X (\d+)[_.](\d+)(?:[_.](\d+))?(?:[_.](\d+))?", "Mac OS X"),
        (r"Android (\d+)(?:\.(\d+))?(?:\.(\d+))?(?:\.(\d+))?", "Android"),
        (r"CrOS \S+ (\d+)\.(\d+)(?:\.(\d+))?(?:\.(\d+))?", "Chrome OS"),
        (r"Linux", "Linux"),
    ]
    .into_iter()
    .map(|(pattern, name)| (Regex::new(pattern).expect("static regex"), name))
    .collect()
});

static SPIDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)bot\b|crawler|spider").expect("static regex"));

fn group(caps: &Captures<'_>, i: usize) -> Option<String> {
    caps.get(i).map(|m| m.as_str().to_string())
}

/// Resolver built on a small table of regexes. Covers the common desktop
/// and mobile browsers, crawlers and curl; anything else is `Other`.
#[derive(Debug, Clone)]
pub struct RegexUserAgentResolver {
    max_length: usize,
}

impl RegexUserAgentResolver {
    pub fn new() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Reject user agents longer than `max_length` bytes.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    fn browser(ua: &str) -> BrowserInfo {
        for (re, name) in BROWSERS.iter() {
            if let Some(caps) = re.captures(ua) {
                return BrowserInfo {
                    name: name.to_string(),
                    major: group(&caps, 1),
                    minor: group(&caps, 2),
                    patch: group(&caps, 3),
                };
            }
        }
        BrowserInfo {
            name: "Other".into(),
            ..Default::default()
        }
    }

    fn os(ua: &str) -> OsInfo {
        for (re, name) in OPERATING_SYSTEMS.iter() {
            if let Some(caps) = re.captures(ua) {
                return OsInfo {
                    name: name.to_string(),
                    major: group(&caps, 1),
                    minor: group(&caps, 2),
                    patch: group(&caps, 3),
                    patch_minor: group(&caps, 4),
                };
            }
        }
        OsInfo {
            name: "Other".into(),
            ..Default::default()
        }
    }

    fn device(ua: &str) -> DeviceInfo {
        let name = if SPIDER.is_match(ua) {
            "Spider"
        } else if ua.contains("iPhone") {
            "iPhone"
        } else if ua.contains("iPad") {
            "iPad"
        } else if ua.contains("Android") {
            if ua.contains("Mobile") {
                "Generic Smartphone"
            } else {
                "Generic Tablet"
            }
        } else if ua.contains("Macintosh") {
            "Mac"
        } else {
            "Other"
        };
        DeviceInfo { name: name.into() }
    }
}

impl Default for RegexUserAgentResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentResolver for RegexUserAgentResolver {
    fn resolve(&self, user_agent: &str) -> Result<UserAgentInfo, UserAgentError> {
        if user_agent.trim().is_empty() {
            return Err(UserAgentError::new("user agent is empty"));
        }
        if user_agent.len() > self.max_length {
            return Err(UserAgentError::new(format!(
                "user agent exceeds {} bytes",
                self.max_length
            )));
        }
        if user_agent.chars().any(char::is_control) {
            return Err(UserAgentError::new("user agent contains control characters"));
        }

        Ok(UserAgentInfo {
            browser: Self::browser(user_agent),
            os: Self::os(user_agent),
            device: Self::device(user_agent),
        })
    }
}

/// Resolves the request's `user-agent` header. Resolver failures are
/// reported under `user_agent.error`.
pub struct UserAgentStep {
    resolver: Arc<dyn UserAgentResolver>,
}

impl UserAgentStep {
    pub fn new(resolver: Arc<dyn UserAgentResolver>) -> Self {
        Self { resolver }
    }
}

impl EnrichmentStep for UserAgentStep {
    fn name(&self) -> &str {
        "user_agent"
    }

    fn enrich(&self, _event: &LogEvent, ambient: &Ambient) -> Result<Contribution, StepError> {
        let Some(original) = ambient.request.header("user-agent") else {
            return Ok(Contribution::none());
        };

        let value = match self.resolver.resolve(original) {
            Ok(info) => json!({
                "original": original,
                "browser": info.browser,
                "os": info.os,
                "device": info.device,
            }),
            Err(err) => {
                let captured = Throwable::from_error(&err);
                json!({
                    "original": original,
                    "error": {
                        "message": captured.display_message(),
                        "stack_trace": captured.stack_trace(),
                    }
                })
            }
        };
        Ok(Contribution::none().with("user_agent", value))
    }
}
