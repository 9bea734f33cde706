//! Executor that runs commands to completion on the local machine

use crate::command::Command;
use crate::error::{Error, Result};
use crate::process::ExitResult;
use futures_lite::future;
use std::io::ErrorKind;
use std::time::Duration;
use tracing::debug;

/// Runs [`Command`]s locally and captures their output
#[derive(Debug, Clone)]
pub struct Executor {
    /// Name used to tag log lines
    name: String,
    /// Upper bound on a single command's runtime
    timeout: Option<Duration>,
}

impl Executor {
    /// Create a new executor with no timeout
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timeout: None,
        }
    }

    /// Bound every command run by this executor
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Execute a command and wait for it to complete
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// [`ExitResult::success`]. Errors mean the command could not be run at
    /// all, or ran past the timeout (in which case the child is killed).
    pub async fn execute(&self, command: &Command) -> Result<ExitResult> {
        debug!("[{}] running: {}", self.name, command.display());

        let mut child = command.prepare();
        let run = async {
            let output = child
                .output()
                .await
                .map_err(|e| spawn_error(command, e))?;
            Ok::<_, Error>(ExitResult {
                status: output.status.into(),
                output: String::from_utf8_lossy(&output.stdout).into_owned(),
                error_output: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        };

        let result = match self.timeout {
            Some(after) => {
                let expire = async {
                    async_io::Timer::after(after).await;
                    Err::<ExitResult, _>(Error::TimedOut {
                        command: command.display(),
                        after,
                    })
                };
                future::or(run, expire).await
            }
            None => run.await,
        }?;

        debug!(
            "[{}] finished with {:?}: {}",
            self.name,
            result.status.code,
            command.display()
        );
        Ok(result)
    }
}

fn spawn_error(command: &Command, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::CommandNotFound {
            command: command.get_program().to_string_lossy().into_owned(),
        }
    } else {
        Error::spawn_failed(format!("{}: {}", command.display(), err))
    }
}
