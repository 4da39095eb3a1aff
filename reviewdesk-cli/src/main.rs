mod logging;
mod oneshot;
mod shell;
#[cfg(test)]
mod testing;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use reviewdesk::config::{resolve_config, validate_server_url, ClientConfig};
use reviewdesk::{Orchestrator, Provider};

#[derive(Parser, Debug)]
#[command(
    name = "reviewdesk",
    version,
    about = "Normalize a submission and a checklist, then review one against the other"
)]
struct Cli {
    /// Path to config.json (defaults to $REVIEWDESK_CONFIG, then the user config dir)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Base URL of the review service
    #[arg(long, value_name = "URL", global = true)]
    server_url: Option<String>,

    /// Log level or filter directive (RUST_LOG takes precedence)
    #[arg(long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive session (default)
    Shell,
    /// Run both transforms and the review once, then print the review
    Run(oneshot::RunArgs),
}

fn load(cli: &Cli) -> Result<ClientConfig> {
    let mut config = resolve_config(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(url) = &cli.server_url {
        validate_server_url(url)?;
        config.server_url = url.clone();
    }
    Ok(config)
}

/// Resolves the configured provider keys and forwards them to the service.
/// Nothing is sent when no key is configured.
async fn forward_keys(orchestrator: &Orchestrator, config: &ClientConfig) -> Result<Vec<Provider>> {
    let sent = orchestrator
        .forward_configured_keys(&config.api_keys)
        .await
        .context("failed to forward API keys")?;
    Ok(sent)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load(&cli)?;

    let level = cli.log_level.as_deref().unwrap_or(&config.log.level);
    logging::init(level, config.log.format)?;

    info!(
        server_url = %config.server_url,
        policy = ?config.in_flight_policy,
        "Starting reviewdesk v{}",
        env!("CARGO_PKG_VERSION")
    );

    let orchestrator = Arc::new(Orchestrator::from_config(&config)?);

    match cli.command.unwrap_or(Command::Shell) {
        Command::Shell => shell::run(orchestrator, &config).await,
        Command::Run(args) => oneshot::run(orchestrator, &config, args).await,
    }
}
