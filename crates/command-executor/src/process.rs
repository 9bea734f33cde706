//! Exit status and captured output of a finished command

/// Process exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code if the process exited normally
    pub code: Option<i32>,
    /// Signal that terminated the process (Unix only)
    #[cfg(unix)]
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Returns true if the process exited successfully (code 0)
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            Self {
                code: status.code(),
                signal: status.signal(),
            }
        }
        #[cfg(not(unix))]
        {
            Self {
                code: status.code(),
            }
        }
    }
}

/// Result of running a command to completion
#[derive(Debug, Clone)]
pub struct ExitResult {
    /// How the process ended
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8)
    pub output: String,
    /// Captured standard error (lossy UTF-8)
    pub error_output: String,
}

impl ExitResult {
    /// Returns true if the process exited with code 0
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// The most useful text to show when the command failed: stderr if it
    /// has anything, otherwise stdout.
    pub fn failure_message(&self) -> &str {
        let stderr = self.error_output.trim();
        if stderr.is_empty() {
            self.output.trim()
        } else {
            stderr
        }
    }
}
