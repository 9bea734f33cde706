//! Service descriptor types.
//!
//! A [`ServiceDescriptor`] says how to start one platform service, how to
//! tell that it is usable, how long to wait for that, and which services must
//! be usable first.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Static description of one managed service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptor {
    /// Unique service name
    pub name: String,
    /// How the container engine starts this service
    pub start_command: StartCommand,
    /// How readiness is checked
    pub readiness_probe: ProbeSpec,
    /// Longest time to keep polling before giving up
    pub max_wait: Duration,
    /// Pause between two readiness probes
    pub poll_interval: Duration,
    /// Services that must be ready before this one starts
    pub dependencies: Vec<String>,
}

impl ServiceDescriptor {
    /// Create a descriptor with no dependencies
    pub fn new(
        name: impl Into<String>,
        start_command: StartCommand,
        readiness_probe: ProbeSpec,
        max_wait: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            start_command,
            readiness_probe,
            max_wait,
            poll_interval,
            dependencies: Vec::new(),
        }
    }

    /// Add dependencies
    pub fn depends_on<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }
}

/// Container-engine handle for a service: which compose service to bring up
/// and which container to query for its state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCommand {
    /// Service name in the compose file
    pub compose_service: String,
    /// Name of the container the compose service creates
    pub container: String,
}

impl StartCommand {
    /// Create a start command
    pub fn new(compose_service: impl Into<String>, container: impl Into<String>) -> Self {
        Self {
            compose_service: compose_service.into(),
            container: container.into(),
        }
    }
}

/// Inclusive range of HTTP status codes that count as ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRange {
    /// Lowest accepted status
    pub low: u16,
    /// Highest accepted status
    pub high: u16,
}

impl StatusRange {
    /// Create a range; `low` must not exceed `high`
    pub const fn new(low: u16, high: u16) -> Self {
        Self { low, high }
    }

    /// 2xx
    pub const fn success() -> Self {
        Self::new(200, 299)
    }

    /// Whether `status` falls inside the range
    pub fn contains(&self, status: u16) -> bool {
        (self.low..=self.high).contains(&status)
    }
}

impl Default for StatusRange {
    fn default() -> Self {
        Self::success()
    }
}

impl fmt::Display for StatusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.low, self.high)
    }
}

/// Readiness check definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeSpec {
    /// HTTP GET; ready when the status falls in `expected_status`
    HttpGet {
        /// URL to request
        url: String,
        /// Accepted status codes
        #[serde(default)]
        expected_status: StatusRange,
    },
    /// Ready when a TCP connection can be opened
    TcpConnect {
        /// Host to connect to
        host: String,
        /// Port to connect to
        port: u16,
    },
    /// Ready when a field of the container's engine-reported state says so
    /// (`healthy`, `running` or `true`)
    ProcessHealthField {
        /// Container name
        container: String,
        /// Dotted path into the container's inspect document, e.g. `State.Status`
        field: String,
    },
}

impl ProbeSpec {
    /// HTTP probe expecting a 2xx response
    pub fn http(url: impl Into<String>) -> Self {
        ProbeSpec::HttpGet {
            url: url.into(),
            expected_status: StatusRange::success(),
        }
    }

    /// TCP connect probe
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        ProbeSpec::TcpConnect {
            host: host.into(),
            port,
        }
    }

    /// Container state field probe
    pub fn process_field(container: impl Into<String>, field: impl Into<String>) -> Self {
        ProbeSpec::ProcessHealthField {
            container: container.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for ProbeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeSpec::HttpGet {
                url,
                expected_status,
            } => write!(f, "GET {} (expect {})", url, expected_status),
            ProbeSpec::TcpConnect { host, port } => write!(f, "tcp://{}:{}", host, port),
            ProbeSpec::ProcessHealthField { container, field } => {
                write!(f, "{}.{}", container, field)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_range_bounds_are_inclusive() {
        let range = StatusRange::new(200, 499);
        assert!(range.contains(200));
        assert!(range.contains(404));
        assert!(range.contains(499));
        assert!(!range.contains(199));
        assert!(!range.contains(503));
    }

    #[test]
    fn test_readiness_spec_serialization_is_tagged() {
        let probe = ProbeSpec::tcp("localhost", 2222);
        let json = serde_json::to_value(&probe).unwrap();
        assert_eq!(json["type"], "tcp_connect");
        assert_eq!(json["port"], 2222);

        let back: ProbeSpec = serde_json::from_value(json).unwrap();
        assert_eq!(back, probe);
    }

    #[test]
    fn test_http_check_defaults_to_2xx() {
        let probe: ProbeSpec =
            serde_json::from_str(r#"{"type":"http_get","url":"http://localhost:5000/"}"#).unwrap();
        assert_eq!(probe, ProbeSpec::http("http://localhost:5000/"));
    }

    #[test]
    fn test_readiness_spec_display() {
        assert_eq!(
            ProbeSpec::process_field("dionaea-honeypot", "State.Status").to_string(),
            "dionaea-honeypot.State.Status"
        );
        assert_eq!(
            ProbeSpec::http("http://localhost:9600/").to_string(),
            "GET http://localhost:9600/ (expect 200-299)"
        );
    }
}
