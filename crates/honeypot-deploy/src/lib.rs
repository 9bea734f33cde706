//! # Honeypot Deploy
//!
//! Support code for the `honeypot-deploy` command: logging setup, preflight
//! checks, report rendering, exit codes and interrupt handling.

#![warn(missing_docs)]

pub mod exit;
pub mod logging;
pub mod preflight;
pub mod report;
pub mod signals;

pub use exit::Exit;
