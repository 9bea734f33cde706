//! Process exit codes

use deploy_config::ConfigError;
use deploy_orchestration::RunReport;
use std::process::ExitCode;

/// How the process ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Every targeted service is ready
    Success,
    /// Preflight refused, engine missing, I/O and similar
    OperationalError,
    /// Cycle, unknown service or invalid configuration; nothing was touched
    ConfigurationError,
    /// At least one service did not reach ReadyConfirmed
    PartialDeploymentFailure,
    /// The operator interrupted the run
    Interrupted,
}

impl Exit {
    /// Numeric exit code
    pub fn code(self) -> u8 {
        match self {
            Exit::Success => 0,
            Exit::OperationalError => 1,
            Exit::ConfigurationError => 3,
            Exit::PartialDeploymentFailure => 4,
            Exit::Interrupted => 130,
        }
    }

    /// Exit for a finished run
    pub fn for_report(report: &RunReport) -> Self {
        if report.was_cancelled() {
            Exit::Interrupted
        } else if report.success {
            Exit::Success
        } else {
            Exit::PartialDeploymentFailure
        }
    }

    /// Exit for an error that stopped the command
    pub fn for_error(error: &anyhow::Error) -> Self {
        for cause in error.chain() {
            if let Some(e) = cause.downcast_ref::<deploy_orchestration::Error>() {
                if e.is_configuration() {
                    return Exit::ConfigurationError;
                }
            }
            if let Some(e) = cause.downcast_ref::<ConfigError>() {
                return match e {
                    ConfigError::ReadError(_) => Exit::OperationalError,
                    ConfigError::Orchestration(inner) if !inner.is_configuration() => {
                        Exit::OperationalError
                    }
                    _ => Exit::ConfigurationError,
                };
            }
        }
        Exit::OperationalError
    }
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;
    use deploy_orchestration::{DeploymentMode, ServiceOutcome, ServiceState};
    use std::time::Duration;

    fn outcome(name: &str, state: ServiceState) -> ServiceOutcome {
        let mut outcome = ServiceOutcome::new(name);
        outcome.finish(state, Duration::from_secs(1));
        outcome
    }

    #[test]
    fn test_report_exit_codes() {
        let ok = RunReport::new(
            DeploymentMode::WebappOnly,
            vec![outcome("webapp", ServiceState::ReadyConfirmed)],
        );
        assert_eq!(Exit::for_report(&ok), Exit::Success);

        let partial = RunReport::new(
            DeploymentMode::ElkOnly,
            vec![
                outcome("elasticsearch", ServiceState::TimedOut),
                ServiceOutcome::skipped("kibana", "elasticsearch"),
            ],
        );
        assert_eq!(Exit::for_report(&partial).code(), 4);

        let interrupted = RunReport::new(
            DeploymentMode::ElkOnly,
            vec![ServiceOutcome::cancelled("elasticsearch")],
        );
        assert_eq!(Exit::for_report(&interrupted).code(), 130);
    }

    #[test]
    fn test_error_exit_codes() {
        let cycle = anyhow::Error::new(deploy_orchestration::Error::CycleDetected(vec![
            "a".into(),
            "b".into(),
            "a".into(),
        ]))
        .context("Failed to plan deployment");
        assert_eq!(Exit::for_error(&cycle).code(), 3);

        let config: anyhow::Result<()> =
            Err(ConfigError::ServiceNotFound("grafana".into())).context("Failed to load deploy.yaml");
        assert_eq!(Exit::for_error(&config.unwrap_err()), Exit::ConfigurationError);

        let engine = anyhow::Error::new(deploy_orchestration::Error::Engine("daemon down".into()));
        assert_eq!(Exit::for_error(&engine), Exit::OperationalError);

        let io = anyhow::anyhow!("docker not found");
        assert_eq!(Exit::for_error(&io).code(), 1);
    }
}
