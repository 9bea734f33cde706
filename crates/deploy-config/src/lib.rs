//! # Deploy Configuration
//!
//! Optional `deploy.yaml` for honeypot-deploy.
//!
//! The service graph itself is fixed; the file only tunes it: where the
//! compose project lives, global timeouts and logging, and per-service
//! overrides of the readiness probe endpoint, `max_wait` and
//! `poll_interval`. String values may reference the environment with
//! `${VAR}` or `${VAR:-default}`.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod parser;
pub mod table;

pub use table::build_table;

/// Configuration file used when none is named
pub const DEFAULT_CONFIG_FILE: &str = "deploy.yaml";

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Override for a service the platform does not have
    #[error("Service '{0}' not found")]
    ServiceNotFound(String),

    /// The resulting descriptor table was rejected
    #[error(transparent)]
    Orchestration(#[from] deploy_orchestration::Error),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Directory holding the compose file; also where the log file goes
    #[serde(default = "default_project_dir")]
    pub project_dir: PathBuf,

    /// Compose file, relative to `project_dir`
    #[serde(default = "default_compose_file")]
    pub compose_file: String,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Per-service overrides keyed by service name
    #[serde(default)]
    pub services: BTreeMap<String, ServiceOverride>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            project_dir: default_project_dir(),
            compose_file: default_compose_file(),
            settings: Settings::default(),
            services: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Absolute-or-relative path of the log file
    pub fn log_path(&self) -> PathBuf {
        self.project_dir.join(self.settings.log_file())
    }
}

fn default_project_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_compose_file() -> String {
    "docker-compose.yml".to_string()
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Default log level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Per-probe timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe_timeout: Option<u64>,

    /// Per container-engine call timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_timeout: Option<u64>,

    /// How many services may be brought up at once
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Log file name, relative to the project directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,
}

impl Settings {
    /// Per-probe timeout, 5s unless set
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout.unwrap_or(5))
    }

    /// Container-engine call timeout, 120s unless set
    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine_timeout.unwrap_or(120))
    }

    /// Worker limit, 4 unless set
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(4)
    }

    /// Log file name, `deployment.log` unless set
    pub fn log_file(&self) -> &str {
        self.log_file.as_deref().unwrap_or("deployment.log")
    }
}

/// Tuning for one service. Name, dependencies and start command stay fixed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceOverride {
    /// Overall readiness budget in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait: Option<u64>,

    /// Seconds between probes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<u64>,

    /// Replacement readiness probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probe: Option<ProbeOverride>,
}

/// Readiness probe as written in the config file.
///
/// The form is picked by its keys; keys belonging to no form are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProbeOverride {
    /// `{http: URL, status: [low, high]}`
    Http(HttpOverride),
    /// `{tcp: "host:port"}`
    Tcp(TcpOverride),
    /// `{container: NAME, field: PATH}`
    Field(FieldOverride),
}

/// HTTP GET readiness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpOverride {
    /// URL to GET
    pub http: String,
    /// Inclusive success range, 2xx when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<[u16; 2]>,
}

/// TCP connect readiness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TcpOverride {
    /// Address to connect to
    pub tcp: String,
}

/// Container inspect-field readiness check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldOverride {
    /// Container to inspect
    pub container: String,
    /// Inspect field path, e.g. `State.Health.Status`
    pub field: String,
}
