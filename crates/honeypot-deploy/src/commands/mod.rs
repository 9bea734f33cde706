pub mod deploy;
pub mod shutdown;
pub mod status;

use anyhow::{Context, Result};
use deploy_config::Config;
use deploy_orchestration::{ComposeEngine, ReadinessChecker, RunReport};
use honeypot_deploy::report::{self, Format};
use std::sync::Arc;

/// Compose engine for the configured project
async fn engine(config: &Config) -> Arc<ComposeEngine> {
    Arc::new(
        ComposeEngine::detect(
            config.project_dir.clone(),
            config.compose_file.clone(),
            config.settings.engine_timeout(),
        )
        .await,
    )
}

fn checker(config: &Config, engine: &Arc<ComposeEngine>) -> Result<Arc<ReadinessChecker>> {
    let checker = ReadinessChecker::new(engine.clone(), config.settings.probe_timeout())
        .context("Failed to create readiness checker")?;
    Ok(Arc::new(checker))
}

fn print_report(report: &RunReport, format: Format) -> Result<()> {
    let rendered = report::render(report, format).context("Failed to render report")?;
    println!("{}", rendered);
    if format == Format::Table {
        println!("{}", report::summary(report));
    }
    Ok(())
}
