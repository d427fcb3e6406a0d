//! Logging setup for the binary.
//!
//! Installs a global tracing subscriber writing to stderr with UTC
//! timestamps. `RUST_LOG` takes precedence over the configured level.

use std::sync::OnceLock;

use time::format_description::FormatItem;
use time::macros::format_description;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// The configured level is not a valid filter directive.
    #[error("Invalid log level {level:?}: {source}")]
    InvalidLevel {
        level: String,
        source: tracing_subscriber::filter::ParseError,
    },
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing at `level` (e.g. `"info"`, `"workout_perf=debug"`).
///
/// Subsequent calls are no-ops.
pub fn init(level: &str) -> Result<(), LoggingError> {
    if INITIALIZED.get().is_some() {
        return Ok(());
    }

    let env_filter = build_env_filter(level)?;
    let stderr_layer = fmt::layer()
        .with_timer(build_timer())
        .with_target(false)
        .with_writer(std::io::stderr);

    let subscriber = Registry::default().with(env_filter).with(stderr_layer);
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
    let _ = INITIALIZED.set(());

    tracing::debug!(level, "logging initialized");
    Ok(())
}

fn build_timer() -> fmt::time::UtcTime<&'static [FormatItem<'static>]> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    fmt::time::UtcTime::new(DISPLAY_FORMAT)
}

fn build_env_filter(level: &str) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|source| LoggingError::InvalidLevel {
        level: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_filter_accepts_plain_and_targeted_levels() {
        assert!(build_env_filter("info").is_ok());
        assert!(build_env_filter("workout_perf=debug,warn").is_ok());
    }

    #[test]
    fn init_is_idempotent() {
        assert!(init("info").is_ok());
        assert!(init("debug").is_ok());
    }
}
