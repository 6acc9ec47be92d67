//! sitepulse CLI
//!
//! Query Plausible analytics and Vercel deployments from the terminal.

mod commands;
mod render;

use clap::{Parser, Subcommand};
use sitepulse_ops::{OpsClient, OpsConfig};
use tracing_subscriber::{EnvFilter, fmt};

/// sitepulse: site analytics and deployments from the terminal.
#[derive(Parser, Debug)]
#[command(name = "sitepulse", version, about)]
struct Cli {
    /// Plausible API root.
    #[arg(long, env = "PLAUSIBLE_API_URL", global = true)]
    plausible_url: Option<String>,

    /// Vercel API root.
    #[arg(long, env = "VERCEL_API_URL", global = true)]
    vercel_url: Option<String>,

    /// Record every API exchange under the debug-log directory.
    #[arg(long, global = true)]
    api_debug: bool,

    /// Output format.
    #[arg(long, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plausible analytics.
    Plausible(commands::plausible::PlausibleArgs),
    /// Vercel projects, deployments, and logs.
    Vercel(commands::vercel::VercelArgs),
    /// Inspect or toggle API debug logging.
    Debug(commands::debug::DebugArgs),
}

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = OpsConfig::from_env();
    if let Some(url) = &cli.plausible_url {
        config = config.with_plausible_url(url);
    }
    if let Some(url) = &cli.vercel_url {
        config = config.with_vercel_url(url);
    }
    if cli.api_debug {
        config = config.with_api_debug(true);
    }
    tracing::debug!(api_debug = config.api_debug, "configuration loaded");
    let ops = OpsClient::from_config(config)?;

    match cli.command {
        Command::Plausible(args) => commands::plausible::run(&ops, &args, &cli.format).await,
        Command::Vercel(args) => commands::vercel::run(&ops, &args, &cli.format).await,
        Command::Debug(args) => commands::debug::run(&ops, &args, &cli.format),
    }
}
