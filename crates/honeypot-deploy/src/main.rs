use anyhow::Result;
use clap::Parser;
use clap::builder::{PossibleValuesParser, TypedValueParser};
use deploy_config::parser;
use deploy_orchestration::{DeploymentMode, ModeSelection};
use honeypot_deploy::report::Format;
use honeypot_deploy::{Exit, logging};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::error;

mod commands;

#[derive(Parser)]
#[command(name = "honeypot-deploy")]
#[command(about = "Honeypot platform deployment - brings services up in dependency order")]
#[command(version)]
struct Cli {
    /// What to deploy, or `status` / `shutdown`
    #[arg(
        short,
        long,
        default_value = "full",
        value_parser = PossibleValuesParser::new(action_names()).try_map(|name| name.parse::<Action>())
    )]
    mode: Action,

    /// Deploy only these honeypots (comma separated)
    #[arg(long, value_delimiter = ',')]
    honeypots: Option<Vec<String>>,

    /// Skip the confirmation prompt when system requirements are not met
    #[arg(short, long)]
    force: bool,

    /// With `--mode shutdown`, also remove volumes (deletes collected data)
    #[arg(long)]
    remove_volumes: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Configuration file path
    #[arg(short, long, default_value = deploy_config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log level (overrides the configuration file and RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

/// A deployment mode, or tearing the platform down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Deploy(DeploymentMode),
    Shutdown,
}

impl FromStr for Action {
    type Err = deploy_orchestration::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "shutdown" => Ok(Action::Shutdown),
            mode => mode.parse().map(Action::Deploy),
        }
    }
}

fn action_names() -> Vec<&'static str> {
    DeploymentMode::ALL
        .iter()
        .map(|mode| mode.as_str())
        .chain(["shutdown"])
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match parser::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load {}: {}", cli.config.display(), e);
            return Exit::for_error(&anyhow::Error::new(e)).into();
        }
    };

    let _guard = logging::init(
        logging::filter(cli.log_level.as_deref(), config.settings.log_level.as_deref()),
        &config.log_path(),
    );

    let exit = smol::block_on(run(&cli, &config)).unwrap_or_else(|e| {
        error!("{:#}", e);
        Exit::for_error(&e)
    });
    exit.into()
}

async fn run(cli: &Cli, config: &deploy_config::Config) -> Result<Exit> {
    let mode = match cli.mode {
        Action::Deploy(mode) => mode,
        Action::Shutdown => return commands::shutdown::run(config, cli.remove_volumes).await,
    };

    if mode.is_read_only() {
        return commands::status::run(config, cli.format).await;
    }

    let mut selection = ModeSelection::new(mode);
    if let Some(honeypots) = &cli.honeypots {
        selection = selection.with_honeypots(honeypots.iter().map(|h| h.trim()));
    }
    commands::deploy::run(config, &selection, cli.force, cli.format).await
}
