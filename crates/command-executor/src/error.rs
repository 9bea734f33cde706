//! Error types for command execution

use std::time::Duration;
use thiserror::Error;

/// Unified error type for command execution
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to spawn a process
    #[error("failed to spawn process: {reason}")]
    SpawnFailed {
        /// The reason for the spawn failure
        reason: String,
    },

    /// Command not found
    #[error("command not found: {command}")]
    CommandNotFound {
        /// The command that was not found
        command: String,
    },

    /// The command did not finish within the executor's timeout
    #[error("command `{command}` timed out after {after:?}")]
    TimedOut {
        /// Rendered command line
        command: String,
        /// The timeout that elapsed
        after: Duration,
    },

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a spawn failed error
    pub fn spawn_failed(reason: impl Into<String>) -> Self {
        Self::SpawnFailed {
            reason: reason.into(),
        }
    }

    /// Whether the program itself could not be found on `PATH`
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::CommandNotFound { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
