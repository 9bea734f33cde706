use super::engine;
use anyhow::{Context, Result};
use deploy_config::Config;
use honeypot_deploy::Exit;
use tracing::{info, warn};

pub async fn run(config: &Config, remove_volumes: bool) -> Result<Exit> {
    if remove_volumes {
        warn!("Removing volumes: all collected honeypot data will be deleted");
    }

    let engine = engine(config).await;
    engine
        .down(remove_volumes)
        .await
        .context("Failed to shut down the platform")?;

    info!("Platform shut down");
    Ok(Exit::Success)
}
