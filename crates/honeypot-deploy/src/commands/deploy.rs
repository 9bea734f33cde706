use super::{checker, engine, print_report};
use anyhow::{Context, Result};
use deploy_config::{Config, build_table};
use deploy_orchestration::{Cancellation, ModeSelection, Orchestrator, OrchestratorSettings, resolve};
use honeypot_deploy::report::{self, Format};
use honeypot_deploy::{Exit, preflight, signals};
use tracing::{info, warn};

pub async fn run(config: &Config, selection: &ModeSelection, force: bool, format: Format) -> Result<Exit> {
    // Configuration problems surface before anything touches the host
    let table = build_table(config).context("Invalid service configuration")?;
    let targets = selection.targets()?;
    let plan = resolve(&table, &targets)?;
    info!("Mode '{}': start order [{}]", selection.mode, plan.names().join(", "));

    let engine = engine(config).await;
    preflight::check_tools(&engine).await?;

    let requirements = preflight::system_requirements(&config.project_dir);
    let unmet = preflight::report_requirements(&requirements);
    if !unmet.is_empty() {
        if force {
            warn!("{} requirement(s) not met, continuing because of --force", unmet.len());
        } else {
            let confirmed = preflight::confirm(&mut std::io::stdin().lock(), &mut std::io::stderr())
                .context("Failed to read confirmation")?;
            if !confirmed {
                anyhow::bail!("Deployment aborted: system requirements not met");
            }
        }
    }

    preflight::prepare_directories(&config.project_dir).with_context(|| {
        format!("Failed to create data directories in {}", config.project_dir.display())
    })?;

    let cancellation = Cancellation::new();
    signals::cancel_on_interrupt(cancellation.clone())
        .context("Failed to install signal handlers")?;

    let orchestrator = Orchestrator::new(engine.clone(), checker(config, &engine)?)
        .with_settings(OrchestratorSettings::with_concurrency(config.settings.concurrency()))
        .with_cancellation(cancellation);

    let report = orchestrator.execute(&plan, selection.mode).await;
    print_report(&report, format)?;

    if report.success && format == Format::Table {
        println!("\nAccess Points:");
        let flask_port = std::env::var("FLASK_HTTP_PORT").ok();
        for (name, location) in report::access_points(flask_port.as_deref()) {
            println!("  - {}: {}", name, location);
        }
    }

    Ok(Exit::for_report(&report))
}
