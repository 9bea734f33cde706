//! Readiness checking.
//!
//! One call to [`ReadinessProbe::probe`] performs exactly one check and is
//! bounded by the checker's per-call timeout, independent of how long the
//! orchestrator is willing to wait for the service overall.

use crate::config::{ProbeSpec, StatusRange};
use crate::engine::ContainerEngine;
use crate::{Error, Result};
use async_net::TcpStream;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::future::Future;
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Engine field values that mean "ready"
const READY_FIELD_VALUES: [&str; 3] = ["healthy", "running", "true"];

/// Outcome of a single readiness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    /// The service answered and is usable
    Ready,
    /// The service answered (or refused) and is not usable yet
    NotReady(String),
    /// The check itself failed (timeout, name resolution, engine error)
    Unknown(String),
}

impl Verdict {
    /// Whether this is [`Verdict::Ready`]
    pub fn is_ready(&self) -> bool {
        matches!(self, Verdict::Ready)
    }
}

/// Something that can run one readiness probe
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Run the probe once
    async fn probe(&self, spec: &ProbeSpec) -> Verdict;
}

/// Stateless checker for all [`ProbeSpec`] variants
pub struct ReadinessChecker {
    http: reqwest::blocking::Client,
    engine: Arc<dyn ContainerEngine>,
    timeout: Duration,
}

impl ReadinessChecker {
    /// Create a checker whose probes each give up after `timeout`.
    ///
    /// `engine` answers [`ProbeSpec::ProcessHealthField`] probes.
    pub fn new(engine: Arc<dyn ContainerEngine>, timeout: Duration) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            engine,
            timeout,
        })
    }

    async fn probe_http(&self, url: &str, expected: StatusRange) -> Verdict {
        let client = self.http.clone();
        let request_url = url.to_string();
        // The blocking client runs on smol's blocking pool; the outer bound
        // only matters if the client's own timeout misbehaves.
        let request = smol::unblock(move || {
            client
                .get(&request_url)
                .send()
                .map(|response| response.status().as_u16())
        });

        match bounded(self.timeout + Duration::from_secs(1), request).await {
            None => Verdict::Unknown(format!("GET {} timed out after {:?}", url, self.timeout)),
            Some(Ok(status)) if expected.contains(status) => Verdict::Ready,
            Some(Ok(status)) => Verdict::NotReady(format!("HTTP {} from {}", status, url)),
            Some(Err(e)) => classify_http_error(url, &e),
        }
    }

    async fn probe_tcp(&self, host: &str, port: u16) -> Verdict {
        match bounded(self.timeout, TcpStream::connect((host, port))).await {
            None => Verdict::Unknown(format!(
                "connect to {}:{} timed out after {:?}",
                host, port, self.timeout
            )),
            // Connected; dropping the stream closes it.
            Some(Ok(_stream)) => Verdict::Ready,
            Some(Err(e)) if is_refusal(e.kind()) => {
                Verdict::NotReady(format!("{}:{}: {}", host, port, e))
            }
            Some(Err(e)) => Verdict::Unknown(format!("{}:{}: {}", host, port, e)),
        }
    }

    async fn probe_field(&self, container: &str, field: &str) -> Verdict {
        match bounded(self.timeout, self.engine.inspect_field(container, field)).await {
            None => Verdict::Unknown(format!(
                "inspect of {} timed out after {:?}",
                container, self.timeout
            )),
            Some(Ok(Some(value))) if READY_FIELD_VALUES.contains(&value.as_str()) => {
                Verdict::Ready
            }
            Some(Ok(Some(value))) => {
                Verdict::NotReady(format!("{}.{} is '{}'", container, field, value))
            }
            Some(Ok(None)) => Verdict::NotReady(format!("container {} does not exist", container)),
            Some(Err(e)) => Verdict::Unknown(e.to_string()),
        }
    }
}

#[async_trait]
impl ReadinessProbe for ReadinessChecker {
    async fn probe(&self, spec: &ProbeSpec) -> Verdict {
        let verdict = match spec {
            ProbeSpec::HttpGet {
                url,
                expected_status,
            } => self.probe_http(url, *expected_status).await,
            ProbeSpec::TcpConnect { host, port } => self.probe_tcp(host, *port).await,
            ProbeSpec::ProcessHealthField { container, field } => {
                self.probe_field(container, field).await
            }
        };
        debug!("Probe {} -> {:?}", spec, verdict);
        verdict
    }
}

/// Await `fut`, or give up with `None` after `limit`
async fn bounded<F: Future>(limit: Duration, fut: F) -> Option<F::Output> {
    smol::future::or(async { Some(fut.await) }, async {
        smol::Timer::after(limit).await;
        None
    })
    .await
}

fn is_refusal(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

/// Refused/reset connections mean the service said no; everything else
/// (timeouts, name resolution, TLS, protocol errors) means the check broke.
fn classify_http_error(url: &str, err: &reqwest::Error) -> Verdict {
    if err.is_timeout() {
        return Verdict::Unknown(format!("GET {} timed out: {}", url, err));
    }

    let mut source: Option<&(dyn StdError + 'static)> = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if is_refusal(io.kind()) {
                return Verdict::NotReady(format!("GET {}: {}", url, io));
            }
            if io.kind() == ErrorKind::TimedOut {
                return Verdict::Unknown(format!("GET {} timed out: {}", url, io));
            }
        }
        source = cause.source();
    }

    Verdict::Unknown(format!("GET {}: {}", url, err))
}
