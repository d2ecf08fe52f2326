//! Structured logging setup.
//!
//! Installs a `tracing` subscriber filtered by `RUST_LOG` when set, otherwise by
//! the configured level. Calling [`init`] again after a subscriber is installed
//! is a no-op.
use tracing_subscriber::{EnvFilter, filter::ParseError, fmt};

use crate::config::LogFormat;

/// Maps level names accepted by the configuration onto `tracing` directives.
fn directive(level: &str) -> &str {
    match level {
        "fatal" | "panic" => "error",
        "warning" => "warn",
        level => level,
    }
}

/// Initializes the global subscriber.
///
/// # Errors
///
/// Returns an error if `level` is not a valid filter directive.
pub fn init(level: &str, format: LogFormat) -> Result<(), ParseError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(directive(&level.to_lowercase()))?,
    };
    let builder = fmt().with_env_filter(filter).with_target(true).with_thread_ids(false);
    // Already initialized
    let _ = match format {
        LogFormat::Line => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    Ok(())
}
