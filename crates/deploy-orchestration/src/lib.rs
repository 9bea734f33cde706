//! # Deploy orchestration
//!
//! Brings up the honeypot research platform (search/store cluster, log
//! pipeline, visualisation, honeypots and the management dashboard) in
//! dependency order, gating every dependent on its dependencies actually
//! answering their readiness probes.
//!
//! The pieces, leaf first:
//!
//! - [`ReadinessChecker`] runs one bounded probe and returns a [`Verdict`].
//! - [`DescriptorTable`] is the fixed set of [`ServiceDescriptor`]s; the
//!   platform's own table comes from [`platform_services`].
//! - [`resolve`] expands a target set to its dependency closure and orders it.
//! - [`Orchestrator`] walks the [`RunPlan`], starting and polling each service,
//!   and produces a [`RunReport`].
//! - [`DeploymentMode`] maps an operator's choice to a target set.
//!
//! ## Example
//!
//! ```no_run
//! use deploy_orchestration::{
//!     ComposeEngine, DeploymentMode, DescriptorTable, ModeSelection, Orchestrator,
//!     ReadinessChecker, platform_services,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> deploy_orchestration::Result<()> {
//! let table = DescriptorTable::new(platform_services())?;
//! let engine = Arc::new(
//!     ComposeEngine::detect(".", "docker-compose.yml", Duration::from_secs(120)).await,
//! );
//! let checker = Arc::new(ReadinessChecker::new(engine.clone(), Duration::from_secs(5))?);
//! let orchestrator = Orchestrator::new(engine, checker);
//!
//! let report = orchestrator
//!     .run(&table, &ModeSelection::new(DeploymentMode::ElkOnly))
//!     .await?;
//! println!("deployment succeeded: {}", report.success);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod catalog;
mod config;
mod engine;
mod health;
mod mode;
mod orchestrator;
mod resolver;
mod state;

pub use catalog::{DescriptorTable, ELK_SERVICES, HONEYPOT_SERVICES, WEBAPP_SERVICES, platform_services};
pub use config::{ProbeSpec, ServiceDescriptor, StartCommand, StatusRange};
pub use engine::{ComposeEngine, ContainerEngine, ContainerState};
pub use health::{ReadinessChecker, ReadinessProbe, Verdict};
pub use mode::{DeploymentMode, ModeSelection};
pub use orchestrator::{Cancellation, DEFAULT_CONCURRENCY, Orchestrator, OrchestratorSettings};
pub use resolver::{RunPlan, resolve};
pub use state::{Phase, RunReport, ServiceOutcome, ServiceState};

/// Error types for orchestration operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The dependency graph reachable from the targets contains a cycle
    #[error("Dependency cycle detected: {}", .0.join(" -> "))]
    CycleDetected(Vec<String>),

    /// A target or dependency names a service missing from the table
    #[error("Unknown service: {0}")]
    UnknownService(String),

    /// Two descriptors share a name
    #[error("Duplicate service definition: {0}")]
    DuplicateService(String),

    /// Invalid configuration or mode selection
    #[error("Configuration error: {0}")]
    Config(String),

    /// A container engine call ran but reported failure
    #[error("Container engine error: {0}")]
    Engine(String),

    /// Command executor errors
    #[error("Command execution error: {0}")]
    CommandExecutor(#[from] command_executor::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this is a configuration error, detected before any container
    /// engine call is made.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::CycleDetected(_)
                | Error::UnknownService(_)
                | Error::DuplicateService(_)
                | Error::Config(_)
        )
    }
}

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;
