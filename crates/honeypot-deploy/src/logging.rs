//! Logging setup.
//!
//! Everything goes to stderr; when the log file can be opened the same
//! events are also appended to it without ANSI colors.

use std::fs::OpenOptions;
use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Keeps the file writer flushing until dropped
#[must_use = "dropping the guard stops writes to the log file"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Pick the filter: explicit flag, then configured level, then `RUST_LOG`,
/// then `info`.
pub fn filter(cli_level: Option<&str>, configured: Option<&str>) -> EnvFilter {
    match cli_level.or(configured) {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the global subscriber
pub fn init(filter: EnvFilter, log_file: &Path) -> LogGuard {
    let opened = OpenOptions::new().create(true).append(true).open(log_file);

    let (file_layer, guard, file_error) = match opened {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if let Some(e) = file_error {
        warn!(
            "Cannot write log file {}, logging to the terminal only: {}",
            log_file.display(),
            e
        );
    }

    LogGuard { _file: guard }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_configured_level() {
        assert_eq!(filter(Some("debug"), Some("warn")).to_string(), "debug");
        assert_eq!(filter(None, Some("warn")).to_string(), "warn");
    }
}
