//! sitepulse MCP Server
//!
//! Exposes Plausible analytics queries to LLM agents via the Model Context
//! Protocol (MCP). Runs over `stdio` transport.

use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use sitepulse_ops::{OpsClient, OpsConfig};
use tracing_subscriber::{EnvFilter, fmt};

mod server;
mod tools;

use server::SitepulseMcpServer;

/// sitepulse MCP Server: expose site analytics to AI agents.
#[derive(Parser, Debug)]
#[command(name = "sitepulse-mcp-server", version, about)]
struct Args {
    /// Plausible API root.
    #[arg(long, env = "PLAUSIBLE_API_URL")]
    plausible_url: Option<String>,

    /// Record every API exchange under the debug-log directory.
    #[arg(long)]
    api_debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // MCP servers MUST NOT write to stdout (that's the transport).
    // Direct logs to stderr instead.
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!(error = %e, "no .env file loaded");
    }

    let args = Args::parse();

    let mut config = OpsConfig::from_env();
    if let Some(url) = &args.plausible_url {
        config = config.with_plausible_url(url);
    }
    if args.api_debug {
        config = config.with_api_debug(true);
    }

    tracing::info!(
        plausible_url = %config.plausible.base_url,
        api_debug = config.api_debug,
        "starting sitepulse MCP server"
    );

    let ops = OpsClient::from_config(config)?;
    let service = SitepulseMcpServer::new(ops).serve(stdio()).await?;

    service.waiting().await?;

    Ok(())
}
