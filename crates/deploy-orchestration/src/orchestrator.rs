//! Run-plan execution
//!
//! The [`Orchestrator`] walks a [`RunPlan`] in order. Each service goes
//! through its own small state machine:
//! check the live container state, start the container unless it is already
//! up, then poll its readiness probe until it reports Ready or `max_wait`
//! runs out. Services whose dependencies are all confirmed ready run as
//! concurrent workers, up to [`OrchestratorSettings::concurrency`] at once.

use crate::catalog::DescriptorTable;
use crate::config::ServiceDescriptor;
use crate::engine::ContainerEngine;
use crate::health::{ReadinessProbe, Verdict};
use crate::mode::{DeploymentMode, ModeSelection};
use crate::resolver::{RunPlan, resolve};
use crate::state::{Phase, RunReport, ServiceOutcome, ServiceState};
use crate::Result;
use async_channel::{Receiver, Sender};
use futures::stream::{self, FuturesUnordered, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default number of services brought up at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Tunables for an orchestration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorSettings {
    /// Maximum number of services started or polled at once (at least 1)
    pub concurrency: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl OrchestratorSettings {
    /// Settings with the given worker limit, clamped to at least 1
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }
}

/// Run-wide cancellation signal.
///
/// Clones share the signal. Cancelling stops further start commands and
/// aborts polls in flight; containers are left as they are.
#[derive(Debug, Clone)]
pub struct Cancellation {
    sender: Sender<()>,
    receiver: Receiver<()>,
}

impl Default for Cancellation {
    fn default() -> Self {
        Self::new()
    }
}

impl Cancellation {
    /// A fresh, not-yet-cancelled signal
    pub fn new() -> Self {
        let (sender, receiver) = async_channel::bounded(1);
        Self { sender, receiver }
    }

    /// Cancel the run. Idempotent.
    pub fn cancel(&self) {
        self.sender.close();
    }

    /// Whether [`cancel`](Self::cancel) has been called
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the run is cancelled
    pub async fn cancelled(&self) {
        // Nothing is ever sent; recv only returns once the channel closes.
        while self.receiver.recv().await.is_ok() {}
    }

    /// Run `fut` unless cancellation comes first
    async fn guard<T>(&self, fut: impl Future<Output = T>) -> Option<T> {
        smol::future::or(async { Some(fut.await) }, async {
            self.cancelled().await;
            None
        })
        .await
    }
}

/// Drives services from the run plan to a terminal state
pub struct Orchestrator {
    engine: Arc<dyn ContainerEngine>,
    probe: Arc<dyn ReadinessProbe>,
    settings: OrchestratorSettings,
    cancellation: Cancellation,
}

impl Orchestrator {
    /// Create an orchestrator over a container engine and a readiness probe
    pub fn new(engine: Arc<dyn ContainerEngine>, probe: Arc<dyn ReadinessProbe>) -> Self {
        Self {
            engine,
            probe,
            settings: OrchestratorSettings::default(),
            cancellation: Cancellation::new(),
        }
    }

    /// Replace the run settings
    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = OrchestratorSettings::with_concurrency(settings.concurrency);
        self
    }

    /// Use an externally controlled cancellation signal
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// The cancellation signal this orchestrator observes
    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Run a mode against `table`.
    ///
    /// Target selection and resolution happen before any container engine
    /// call, so a configuration error leaves the engine untouched.
    pub async fn run(&self, table: &DescriptorTable, selection: &ModeSelection) -> Result<RunReport> {
        if selection.mode.is_read_only() {
            return Ok(self.status(table).await);
        }

        let targets = selection.targets()?;
        let plan = resolve(table, &targets)?;
        info!(
            "Deploying mode '{}': start order [{}]",
            selection.mode,
            plan.names().join(", ")
        );

        Ok(self.execute(&plan, selection.mode).await)
    }

    /// Bring up every service in `plan`.
    ///
    /// A service is scheduled once all of its dependencies reached
    /// ReadyConfirmed; if any dependency failed it is skipped. Independent
    /// services keep going when a sibling fails.
    pub async fn execute(&self, plan: &RunPlan, mode: DeploymentMode) -> RunReport {
        let services = plan.services();
        let limit = self.settings.concurrency.max(1);

        let mut outcomes: Vec<Option<ServiceOutcome>> = vec![None; services.len()];
        let mut finished: HashMap<String, bool> = HashMap::new();
        let mut pending: Vec<usize> = (0..services.len()).collect();
        let mut running = FuturesUnordered::new();

        loop {
            if !self.cancellation.is_cancelled() {
                let mut i = 0;
                while i < pending.len() {
                    let index = pending[i];
                    let service = &services[index];

                    if let Some(failed) = service
                        .dependencies
                        .iter()
                        .find(|dep| finished.get(dep.as_str()) == Some(&false))
                    {
                        warn!(
                            "Skipping {}: dependency {} did not become ready",
                            service.name, failed
                        );
                        outcomes[index] = Some(ServiceOutcome::skipped(&service.name, failed));
                        finished.insert(service.name.clone(), false);
                        pending.remove(i);
                        continue;
                    }

                    let ready = service
                        .dependencies
                        .iter()
                        .all(|dep| finished.get(dep.as_str()) == Some(&true));
                    if ready && running.len() < limit {
                        if !plan.is_target(&service.name) {
                            info!("{} is needed as a dependency of the selected services", service.name);
                        }
                        let service = Arc::clone(service);
                        running.push(async move { (index, self.bring_up(&service).await) });
                        pending.remove(i);
                        continue;
                    }

                    i += 1;
                }
            }

            let Some((index, outcome)) = running.next().await else {
                break;
            };
            finished.insert(outcome.name.clone(), outcome.state.is_success());
            outcomes[index] = Some(outcome);
        }

        for index in pending {
            outcomes[index] = Some(ServiceOutcome::cancelled(&services[index].name));
        }

        let report = RunReport::new(mode, outcomes.into_iter().flatten().collect());
        if report.success {
            info!("All {} services ready", report.outcomes.len());
        } else {
            warn!(
                "{} of {} services did not become ready",
                report.failures().count(),
                report.outcomes.len()
            );
        }
        report
    }

    /// Read-only pass over every service in `table`.
    ///
    /// Never issues a start command.
    pub async fn status(&self, table: &DescriptorTable) -> RunReport {
        let limit = self.settings.concurrency.max(1);
        let outcomes: Vec<ServiceOutcome> = stream::iter(table.iter())
            .map(|service| self.inspect(service))
            .buffered(limit)
            .collect()
            .await;

        RunReport::new(DeploymentMode::StatusOnly, outcomes)
    }

    async fn inspect(&self, service: &ServiceDescriptor) -> ServiceOutcome {
        let began = Instant::now();
        let mut outcome = ServiceOutcome::new(&service.name);

        let up = match self.engine.container_state(service).await {
            Ok(state) => {
                debug!("{} container state: {:?}", service.name, state);
                state.is_up()
            }
            Err(e) => {
                warn!("Could not query container state of {}: {}", service.name, e);
                outcome.error = Some(e.to_string());
                false
            }
        };

        let verdict = self.probe.probe(&service.readiness_probe).await;
        outcome.probe_attempts = 1;
        if let Verdict::Unknown(cause) = &verdict {
            outcome.unknown_verdicts = 1;
            debug!("{} probe inconclusive: {}", service.name, cause);
        }

        outcome.already_running = up;
        outcome.state = match (up, verdict.is_ready()) {
            (true, true) => ServiceState::ReadyConfirmed,
            (true, false) => ServiceState::AlreadyRunning,
            (false, ready) => {
                // Something else may be answering on the service's port
                if ready && outcome.error.is_none() {
                    outcome.error = Some(
                        "readiness check answered but the container is not running".to_string(),
                    );
                }
                ServiceState::NotStarted
            }
        };
        outcome.last_verdict = Some(verdict);
        outcome.elapsed = began.elapsed();
        outcome
    }

    /// Per-service state machine:
    /// `NotStarted -> Starting -> Polling -> {ReadyConfirmed | TimedOut}`,
    /// with `StartFailed` out of Starting and the already-running shortcut
    /// straight into Polling.
    async fn bring_up(&self, service: &ServiceDescriptor) -> ServiceOutcome {
        let began = Instant::now();
        let mut outcome = ServiceOutcome::new(&service.name);

        if self.cancellation.is_cancelled() {
            return ServiceOutcome::cancelled(&service.name);
        }

        let state = match self.cancellation.guard(self.engine.container_state(service)).await {
            Some(state) => state,
            None => {
                outcome.finish(ServiceState::Cancelled, began.elapsed());
                return outcome;
            }
        };

        match state {
            Ok(state) if state.is_up() => {
                info!("{} is already running ({:?}), checking readiness", service.name, state);
                outcome.already_running = true;
                outcome.state = ServiceState::AlreadyRunning;
            }
            other => {
                if let Err(e) = other {
                    warn!(
                        "Could not query container state of {}, starting it anyway: {}",
                        service.name, e
                    );
                }
                if self.cancellation.is_cancelled() {
                    outcome.finish(ServiceState::Cancelled, began.elapsed());
                    return outcome;
                }

                info!("Starting {}", service.name);
                outcome.phase = Phase::Starting;
                if let Err(e) = self.engine.start(service).await {
                    error!("Failed to start {}: {}", service.name, e);
                    outcome.error = Some(e.to_string());
                    outcome.finish(ServiceState::StartFailed, began.elapsed());
                    return outcome;
                }
                outcome.state = ServiceState::Started;
            }
        }

        outcome.phase = Phase::Polling;
        let final_state = self.poll(service, &mut outcome).await;
        outcome.finish(final_state, began.elapsed());
        match final_state {
            ServiceState::ReadyConfirmed => info!(
                "{} is ready after {:.1}s",
                service.name,
                outcome.elapsed.as_secs_f64()
            ),
            ServiceState::TimedOut => warn!(
                "{} did not become ready within {:?}",
                service.name, service.max_wait
            ),
            _ => info!("{} interrupted while waiting for readiness", service.name),
        }
        outcome
    }

    /// Probe until Ready, `max_wait` runs out, or the run is cancelled
    async fn poll(&self, service: &ServiceDescriptor, outcome: &mut ServiceOutcome) -> ServiceState {
        let began = Instant::now();

        loop {
            let Some(verdict) = self
                .cancellation
                .guard(self.probe.probe(&service.readiness_probe))
                .await
            else {
                outcome.error = Some("cancelled while waiting for readiness".to_string());
                return ServiceState::Cancelled;
            };

            outcome.probe_attempts += 1;
            match &verdict {
                Verdict::Ready => {
                    outcome.last_verdict = Some(verdict);
                    return ServiceState::ReadyConfirmed;
                }
                Verdict::NotReady(detail) => {
                    debug!("{} not ready yet: {}", service.name, detail);
                }
                Verdict::Unknown(cause) => {
                    outcome.unknown_verdicts += 1;
                    warn!("{} readiness unknown: {}", service.name, cause);
                }
            }
            outcome.last_verdict = Some(verdict);

            let elapsed = began.elapsed();
            if elapsed >= service.max_wait {
                outcome.error = Some(format!(
                    "not ready after {} probes in {:.1}s",
                    outcome.probe_attempts,
                    elapsed.as_secs_f64()
                ));
                return ServiceState::TimedOut;
            }

            let pause = service.poll_interval.min(service.max_wait - elapsed);
            if self.cancellation.guard(sleep(pause)).await.is_none() {
                outcome.error = Some("cancelled while waiting for readiness".to_string());
                return ServiceState::Cancelled;
            }
        }
    }
}

async fn sleep(duration: Duration) {
    smol::Timer::after(duration).await;
}
