//! Docker Compose adapter for the container engine seam.

use super::{ContainerEngine, ContainerState};
use crate::{Error, Result, config::ServiceDescriptor};
use async_trait::async_trait;
use command_executor::{Command, ExitResult, Executor};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Drives the platform through `docker compose` (or legacy `docker-compose`)
/// and queries containers through `docker inspect`.
#[derive(Debug, Clone)]
pub struct ComposeEngine {
    executor: Executor,
    /// Compose invocation, e.g. `["docker", "compose"]`
    compose: Vec<String>,
    project_dir: PathBuf,
    compose_file: PathBuf,
}

impl ComposeEngine {
    /// Create an engine with an explicit compose invocation
    pub fn new(
        compose: Vec<String>,
        project_dir: impl Into<PathBuf>,
        compose_file: impl Into<PathBuf>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            executor: Executor::new("container-engine").with_timeout(call_timeout),
            compose,
            project_dir: project_dir.into(),
            compose_file: compose_file.into(),
        }
    }

    /// Create an engine using whichever compose flavour answers `version`.
    ///
    /// The v2 plugin (`docker compose`) is preferred over the standalone
    /// `docker-compose`. If neither answers, the v2 form is used so that the
    /// first real call fails with a clear message.
    pub async fn detect(
        project_dir: impl Into<PathBuf>,
        compose_file: impl Into<PathBuf>,
        call_timeout: Duration,
    ) -> Self {
        let probe = Executor::new("compose-detect").with_timeout(call_timeout);
        let candidates: [&[&str]; 2] = [&["docker", "compose"], &["docker-compose"]];

        let mut chosen = vec!["docker".to_string(), "compose".to_string()];
        for candidate in candidates {
            let mut cmd = Command::new(candidate[0]);
            cmd.args(&candidate[1..]).arg("version");
            match probe.execute(&cmd).await {
                Ok(result) if result.success() => {
                    chosen = candidate.iter().map(|s| s.to_string()).collect();
                    break;
                }
                Ok(result) => debug!("{} unavailable: {}", cmd.display(), result.failure_message()),
                Err(e) => debug!("{} unavailable: {}", cmd.display(), e),
            }
        }
        info!("Using compose command: {}", chosen.join(" "));

        Self::new(chosen, project_dir, compose_file, call_timeout)
    }

    /// The compose invocation in use
    pub fn compose_command(&self) -> String {
        self.compose.join(" ")
    }

    /// `<compose> version`, for preflight reporting
    pub async fn compose_version(&self) -> Result<String> {
        let result = self.run(&self.compose_cmd(["version"])).await?;
        Ok(result.output.trim().to_string())
    }

    /// Stop and remove the platform's containers, and its volumes when
    /// `remove_volumes` is set.
    pub async fn down(&self, remove_volumes: bool) -> Result<()> {
        let mut cmd = self.compose_cmd(["down"]);
        if remove_volumes {
            cmd.arg("-v");
        }
        info!("Shutting down: {}", cmd.display());
        self.run(&cmd).await.map(|_| ())
    }

    fn compose_cmd<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        let (program, prefix) = match self.compose.split_first() {
            Some((program, prefix)) => (program.as_str(), prefix),
            None => ("docker", &[][..]),
        };
        let mut cmd = Command::new(program);
        cmd.args(prefix)
            .arg("-f")
            .arg(&self.compose_file)
            .args(args)
            .current_dir(&self.project_dir);
        cmd
    }

    fn inspect_cmd(container: &str, template: &str) -> Command {
        Command::builder("docker")
            .args(["inspect", "--format", template, container])
            .build()
    }

    /// Run a command, turning a non-zero exit into [`Error::Engine`]
    async fn run(&self, cmd: &Command) -> Result<ExitResult> {
        let result = self.executor.execute(cmd).await?;
        if result.success() {
            Ok(result)
        } else {
            Err(Error::Engine(format!(
                "`{}` failed: {}",
                cmd.display(),
                result.failure_message()
            )))
        }
    }

    /// Run an inspect command; `Ok(None)` when the container does not exist
    async fn inspect(&self, cmd: &Command) -> Result<Option<String>> {
        let result = self.executor.execute(cmd).await?;
        if result.success() {
            return Ok(Some(result.output.trim().to_string()));
        }
        if is_missing_container(result.failure_message()) {
            return Ok(None);
        }
        Err(Error::Engine(format!(
            "`{}` failed: {}",
            cmd.display(),
            result.failure_message()
        )))
    }
}

/// Whether `docker inspect` output says the object does not exist
fn is_missing_container(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("no such object") || message.contains("no such container")
}

#[async_trait]
impl ContainerEngine for ComposeEngine {
    async fn container_state(&self, service: &ServiceDescriptor) -> Result<ContainerState> {
        let cmd = Self::inspect_cmd(&service.start_command.container, "{{.State.Status}}");
        let state = match self.inspect(&cmd).await? {
            Some(status) => ContainerState::from_engine_status(&status),
            None => ContainerState::NotCreated,
        };
        debug!("Container '{}' state: {:?}", service.start_command.container, state);
        Ok(state)
    }

    async fn start(&self, service: &ServiceDescriptor) -> Result<()> {
        // --no-deps: start order is ours, not compose's
        let cmd = self.compose_cmd([
            "up",
            "-d",
            "--no-deps",
            service.start_command.compose_service.as_str(),
        ]);
        info!("Starting service '{}': {}", service.name, cmd.display());

        match self.run(&cmd).await {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!("Start of '{}' rejected: {}", service.name, e);
                Err(e)
            }
        }
    }

    async fn inspect_field(&self, container: &str, field: &str) -> Result<Option<String>> {
        let template = format!("{{{{.{}}}}}", field.trim_start_matches('.'));
        self.inspect(&Self::inspect_cmd(container, &template)).await
    }
}
