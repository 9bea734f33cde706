//! Deployment modes and the target sets they select.

use crate::catalog::{ELK_SERVICES, HONEYPOT_SERVICES, WEBAPP_SERVICES};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A named subset of the platform an operator can bring up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentMode {
    /// Everything
    Full,
    /// Search/store cluster, log pipeline and visualisation
    ElkOnly,
    /// Honeypot emulators
    HoneypotsOnly,
    /// Management dashboard
    WebappOnly,
    /// Start nothing; report the state of every known service
    #[serde(rename = "status")]
    StatusOnly,
}

impl DeploymentMode {
    /// All modes, in the order they are offered to operators
    pub const ALL: [DeploymentMode; 5] = [
        DeploymentMode::Full,
        DeploymentMode::ElkOnly,
        DeploymentMode::HoneypotsOnly,
        DeploymentMode::WebappOnly,
        DeploymentMode::StatusOnly,
    ];

    /// Services this mode asks for. `Full` is the union of the other modes;
    /// `StatusOnly` selects nothing.
    pub fn targets(self) -> Vec<&'static str> {
        match self {
            DeploymentMode::Full => DeploymentMode::ALL
                .iter()
                .filter(|mode| **mode != DeploymentMode::Full)
                .flat_map(|mode| mode.targets())
                .collect(),
            DeploymentMode::ElkOnly => ELK_SERVICES.to_vec(),
            DeploymentMode::HoneypotsOnly => HONEYPOT_SERVICES.to_vec(),
            DeploymentMode::WebappOnly => WEBAPP_SERVICES.to_vec(),
            DeploymentMode::StatusOnly => Vec::new(),
        }
    }

    /// Whether this mode only observes and never starts anything
    pub fn is_read_only(self) -> bool {
        self == DeploymentMode::StatusOnly
    }

    /// Name used on the command line and in reports
    pub fn as_str(self) -> &'static str {
        match self {
            DeploymentMode::Full => "full",
            DeploymentMode::ElkOnly => "elk-only",
            DeploymentMode::HoneypotsOnly => "honeypots-only",
            DeploymentMode::WebappOnly => "webapp-only",
            DeploymentMode::StatusOnly => "status",
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DeploymentMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| Error::Config(format!("Unknown deployment mode: {}", s)))
    }
}

/// A mode plus the optional narrowing of the honeypot group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeSelection {
    /// Selected mode
    pub mode: DeploymentMode,
    /// When set, only these honeypots are deployed (full and honeypots-only)
    pub honeypots: Option<Vec<String>>,
}

impl ModeSelection {
    /// Select a mode with the whole honeypot group
    pub fn new(mode: DeploymentMode) -> Self {
        Self {
            mode,
            honeypots: None,
        }
    }

    /// Narrow the honeypot group
    pub fn with_honeypots<I, S>(mut self, honeypots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.honeypots = Some(honeypots.into_iter().map(Into::into).collect());
        self
    }

    /// Target service names for this selection
    pub fn targets(&self) -> Result<Vec<String>> {
        let Some(chosen) = &self.honeypots else {
            return Ok(self.mode.targets().into_iter().map(String::from).collect());
        };

        for name in chosen {
            if !HONEYPOT_SERVICES.contains(&name.as_str()) {
                return Err(Error::Config(format!(
                    "'{}' is not a honeypot (expected one of: {})",
                    name,
                    HONEYPOT_SERVICES.join(", ")
                )));
            }
        }
        if chosen.is_empty() {
            return Err(Error::Config("Empty honeypot selection".to_string()));
        }

        Ok(self
            .mode
            .targets()
            .into_iter()
            .filter(|name| {
                !HONEYPOT_SERVICES.contains(name) || chosen.iter().any(|c| c == name)
            })
            .map(String::from)
            .collect())
    }
}
