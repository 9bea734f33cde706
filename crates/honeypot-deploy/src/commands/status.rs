use super::{checker, engine, print_report};
use anyhow::{Context, Result};
use deploy_config::{Config, build_table};
use deploy_orchestration::{Orchestrator, OrchestratorSettings};
use honeypot_deploy::Exit;
use honeypot_deploy::report::Format;

/// Read-only pass over every service; never starts anything
pub async fn run(config: &Config, format: Format) -> Result<Exit> {
    let table = build_table(config).context("Invalid service configuration")?;
    let engine = engine(config).await;

    let orchestrator = Orchestrator::new(engine.clone(), checker(config, &engine)?)
        .with_settings(OrchestratorSettings::with_concurrency(config.settings.concurrency()));
    let report = orchestrator.status(&table).await;
    print_report(&report, format)?;

    Ok(if report.success {
        Exit::Success
    } else {
        Exit::PartialDeploymentFailure
    })
}
