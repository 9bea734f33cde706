//! Runtime-agnostic command execution library
//!
//! This crate runs short-lived local commands to completion and captures
//! their output. It is the single path through which the deployment tooling
//! talks to the container engine CLI, so every call shares the same spawn
//! error mapping, output capture and per-call timeout.
//!
//! ```no_run
//! use command_executor::{Command, Executor};
//! use std::time::Duration;
//!
//! # async fn example() -> command_executor::Result<()> {
//! let executor = Executor::new("engine").with_timeout(Duration::from_secs(30));
//! let cmd = Command::builder("docker").arg("--version").build();
//! let result = executor.execute(&cmd).await?;
//! println!("{}", result.output.trim());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod executor;
pub mod process;

pub use command::{Command, CommandBuilder};
pub use error::{Error, Result};
pub use executor::Executor;
pub use process::{ExitResult, ExitStatus};
