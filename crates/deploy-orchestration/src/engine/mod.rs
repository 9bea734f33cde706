//! Container engine seam.
//!
//! The orchestrator never talks to the engine directly; it goes through
//! [`ContainerEngine`], which the compose adapter implements for real runs
//! and tests implement with fakes.

mod compose;

pub use compose::ComposeEngine;

use crate::{Result, config::ServiceDescriptor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Engine-reported state of a service's container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerState {
    /// No container exists
    NotCreated,
    /// Container exists but is not running (created, exited, paused, dead)
    Stopped,
    /// Container is coming up (restarting)
    Starting,
    /// Container is running
    Running,
}

impl ContainerState {
    /// Whether a start command would be redundant
    pub fn is_up(self) -> bool {
        matches!(self, ContainerState::Running | ContainerState::Starting)
    }

    /// Map the engine's state string (`{{.State.Status}}`)
    pub fn from_engine_status(status: &str) -> Self {
        match status.trim() {
            "running" => ContainerState::Running,
            "restarting" => ContainerState::Starting,
            _ => ContainerState::Stopped,
        }
    }
}

/// Operations the orchestrator needs from the container engine
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Query the current state of the service's container. Read-only.
    async fn container_state(&self, service: &ServiceDescriptor) -> Result<ContainerState>;

    /// Start the service's container. An `Err` means the engine rejected
    /// the request.
    async fn start(&self, service: &ServiceDescriptor) -> Result<()>;

    /// Read one field of a container's inspect document. `Ok(None)` means
    /// the container does not exist. Read-only.
    async fn inspect_field(&self, container: &str, field: &str) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_status_mapping() {
        assert_eq!(ContainerState::from_engine_status("running\n"), ContainerState::Running);
        assert_eq!(ContainerState::from_engine_status("restarting"), ContainerState::Starting);
        for stopped in ["created", "exited", "paused", "dead", "removing"] {
            assert_eq!(ContainerState::from_engine_status(stopped), ContainerState::Stopped);
        }
    }

    #[test]
    fn test_up_states() {
        assert!(ContainerState::Running.is_up());
        assert!(ContainerState::Starting.is_up());
        assert!(!ContainerState::Stopped.is_up());
        assert!(!ContainerState::NotCreated.is_up());
    }
}
