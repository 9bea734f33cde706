//! Per-service outcomes and the run report.
//!
//! A [`RunReport`] is built fresh for every run and thrown away once
//! reported. It is also the document the dashboard polls, so it deserializes
//! from an empty or partial JSON object.

use crate::health::Verdict;
use crate::mode::DeploymentMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Where a service ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Container is not running (status pass only)
    NotStarted,
    /// Container was already running; in a status pass, also not yet ready
    AlreadyRunning,
    /// Start command accepted, readiness not yet confirmed
    Started,
    /// Probe returned Ready
    ReadyConfirmed,
    /// Probe never returned Ready within `max_wait`
    TimedOut,
    /// Container engine rejected the start (or the state query failed)
    StartFailed,
    /// A dependency did not become ready, so this service was not attempted
    SkippedDependencyFailed,
    /// The run was interrupted before this service finished
    Cancelled,
}

impl ServiceState {
    /// Whether this state counts toward overall success
    pub fn is_success(self) -> bool {
        self == ServiceState::ReadyConfirmed
    }

    /// Whether the state ends a service's deployment
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ServiceState::ReadyConfirmed
                | ServiceState::TimedOut
                | ServiceState::StartFailed
                | ServiceState::SkippedDependencyFailed
                | ServiceState::Cancelled
        )
    }

    /// Short lowercase label for tables and logs
    pub fn label(self) -> &'static str {
        match self {
            ServiceState::NotStarted => "not started",
            ServiceState::AlreadyRunning => "already running",
            ServiceState::Started => "started",
            ServiceState::ReadyConfirmed => "ready",
            ServiceState::TimedOut => "timed out",
            ServiceState::StartFailed => "start failed",
            ServiceState::SkippedDependencyFailed => "skipped (dependency failed)",
            ServiceState::Cancelled => "cancelled",
        }
    }
}

/// Furthest point of the per-service state machine a service reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing issued yet
    #[default]
    NotStarted,
    /// Start command issued
    Starting,
    /// Readiness polling
    Polling,
    /// Reached a terminal state
    Finished,
}

/// What happened to one service during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceOutcome {
    /// Service name
    pub name: String,
    /// Final state
    pub state: ServiceState,
    /// Phase reached before the final state
    #[serde(default)]
    pub phase: Phase,
    /// The container was already up, so no start command was issued
    #[serde(default)]
    pub already_running: bool,
    /// Time spent on this service
    #[serde(default, rename = "elapsed_ms", with = "duration_ms")]
    pub elapsed: Duration,
    /// Number of readiness probes run
    #[serde(default)]
    pub probe_attempts: u32,
    /// How many of those came back Unknown
    #[serde(default)]
    pub unknown_verdicts: u32,
    /// Verdict of the last probe
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_verdict: Option<Verdict>,
    /// Last error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceOutcome {
    /// A fresh outcome in the not-started state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: ServiceState::NotStarted,
            phase: Phase::NotStarted,
            already_running: false,
            elapsed: Duration::ZERO,
            probe_attempts: 0,
            unknown_verdicts: 0,
            last_verdict: None,
            error: None,
        }
    }

    /// Outcome for a service whose dependency failed
    pub fn skipped(name: impl Into<String>, failed_dependency: &str) -> Self {
        let mut outcome = Self::new(name);
        outcome.state = ServiceState::SkippedDependencyFailed;
        outcome.error = Some(format!("dependency '{}' did not become ready", failed_dependency));
        outcome
    }

    /// Outcome for a service the run never got to because it was cancelled
    pub fn cancelled(name: impl Into<String>) -> Self {
        let mut outcome = Self::new(name);
        outcome.state = ServiceState::Cancelled;
        outcome.error = Some("run cancelled before start".to_string());
        outcome
    }

    /// Set a terminal state
    pub fn finish(&mut self, state: ServiceState, elapsed: Duration) {
        self.state = state;
        self.elapsed = elapsed;
        if state.is_terminal() {
            self.phase = Phase::Finished;
        }
    }
}

/// Ordered outcomes of one run plus the overall verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Mode the run was invoked with
    #[serde(default)]
    pub mode: Option<DeploymentMode>,
    /// Outcomes in start order
    #[serde(default)]
    pub outcomes: Vec<ServiceOutcome>,
    /// True iff every service in the run reached ReadyConfirmed
    #[serde(default)]
    pub success: bool,
    /// When the report was completed
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
}

impl RunReport {
    /// Build a completed report
    pub fn new(mode: DeploymentMode, outcomes: Vec<ServiceOutcome>) -> Self {
        let success = outcomes.iter().all(|o| o.state.is_success());
        Self {
            mode: Some(mode),
            outcomes,
            success,
            generated_at: Some(Utc::now()),
        }
    }

    /// Outcome for a service
    pub fn get(&self, name: &str) -> Option<&ServiceOutcome> {
        self.outcomes.iter().find(|o| o.name == name)
    }

    /// Number of outcomes in `state`
    pub fn count(&self, state: ServiceState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    /// Outcomes that did not reach ReadyConfirmed
    pub fn failures(&self) -> impl Iterator<Item = &ServiceOutcome> {
        self.outcomes.iter().filter(|o| !o.state.is_success())
    }

    /// Whether the run was interrupted
    pub fn was_cancelled(&self) -> bool {
        self.count(ServiceState::Cancelled) > 0
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
