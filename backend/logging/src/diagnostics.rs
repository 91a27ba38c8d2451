//! The pipeline's own diagnostics.
//!
//! Rotation failures, degraded enrichment and sink errors are reported with
//! `tracing`. This installs a subscriber for them: stderr always, plus a
//! daily-rolled NDJSON file when a directory is given. Diagnostics never go
//! through a `Logger`.

use std::path::Path;

use tracing::warn;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DIAGNOSTICS_FILE: &str = "beatlog-diagnostics.log";

/// Install the global diagnostics subscriber. `RUST_LOG` overrides `level`.
/// Does nothing if a global subscriber is already set. If the file cannot
/// be opened, diagnostics go to stderr only.
pub fn init_diagnostics(level: &str, log_dir: Option<&Path>) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (appender, file_error) = match log_dir.map(diagnostics_file).transpose() {
        Ok(appender) => (appender, None),
        Err(e) => (None, Some(e)),
    };
    let file_layer = appender.map(|appender| {
        fmt::layer()
            .json()
            .with_writer(appender)
            .with_ansi(false)
    });

    // stdout may carry log lines, so diagnostics stay on stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let (Some(dir), Some(e)) = (log_dir, file_error) {
        warn!(dir = %dir.display(), error = %e, "Diagnostics file unavailable, using stderr only");
    }
}

/// `beatlog-diagnostics.log.YYYY-MM-DD` in `dir`, rolled daily.
fn diagnostics_file(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(DIAGNOSTICS_FILE)
        .build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_file_opens_in_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(diagnostics_file(dir.path()).is_ok());
    }

    #[test]
    fn diagnostics_file_under_a_regular_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let not_a_dir = dir.path().join("plain");
        std::fs::write(&not_a_dir, "x").unwrap();
        assert!(diagnostics_file(&not_a_dir).is_err());
    }
}
