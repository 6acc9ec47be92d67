use std::path::PathBuf;

use clap::Args;
use sitepulse_ops::OpsClient;
use sitepulse_ops::debug_logs;

use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct DebugArgs {
    /// Turn API debug logging on (writes API_DEBUG=true to the env file).
    #[arg(long, conflicts_with_all = ["disable", "clear"])]
    pub enable: bool,

    /// Turn API debug logging off.
    #[arg(long, conflicts_with = "clear")]
    pub disable: bool,

    /// Delete all recorded API logs.
    #[arg(long)]
    pub clear: bool,

    /// Env file holding the API_DEBUG flag.
    #[arg(long, default_value = ".env")]
    pub env_file: PathBuf,
}

pub fn run(ops: &OpsClient, args: &DebugArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let dir = &ops.config().log_dir;

    if args.enable || args.disable {
        debug_logs::set_debug_flag(&args.env_file, args.enable)?;
        let state = if args.enable { "enabled" } else { "disabled" };
        println!(
            "API debug logging {state} in {} (takes effect on the next run).",
            args.env_file.display()
        );
        return Ok(());
    }

    if args.clear {
        match debug_logs::clear(dir)? {
            Some(files) => println!("Removed {files} log files from {}.", dir.display()),
            None => println!("No logs to clear in {}.", dir.display()),
        }
        return Ok(());
    }

    let status = debug_logs::status(dir, ops.config().api_debug)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => {
            let state = if status.enabled { "enabled" } else { "disabled" };
            println!("API debug logging is {state}.");
            println!("Log directory: {}", status.dir.display());
            println!("Log files: {}", status.files);
        }
    }
    Ok(())
}
