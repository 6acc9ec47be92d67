use std::path::PathBuf;

use chrono::DateTime;
use clap::{Args, Subcommand};
use sitepulse_ops::OpsClient;
use sitepulse_ops::deployments::{DeploymentLogs, LogTarget};
use sitepulse_ops::sitepulse_core::{Deployment, DeploymentEvent};

use crate::OutputFormat;
use crate::render;

#[derive(Args, Debug)]
pub struct VercelArgs {
    #[command(subcommand)]
    pub command: VercelCommand,
}

#[derive(Subcommand, Debug)]
pub enum VercelCommand {
    /// List projects with their latest deployments.
    Projects {
        /// Show every recent deployment, not just the latest.
        #[arg(short, long)]
        verbose: bool,
        /// Also save the result as JSON to this file.
        #[arg(short, long)]
        json: Option<PathBuf>,
    },
    /// List deployments of a project.
    Deployments {
        /// Project id or name.
        #[arg(short, long)]
        project: String,
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
        #[arg(short, long)]
        json: Option<PathBuf>,
        /// Only show successful deployments.
        #[arg(short, long)]
        success: bool,
    },
    /// Show build and runtime logs of a deployment.
    Logs {
        /// Project id or name; uses its active deployment.
        #[arg(short, long, required_unless_present = "deployment", conflicts_with = "deployment")]
        project: Option<String>,
        /// Deployment id.
        #[arg(short, long)]
        deployment: Option<String>,
        /// Only events of this type (stdout, stderr, error, deployment-state, ...).
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Newest events to show (default 100).
        #[arg(short, long)]
        limit: Option<usize>,
        #[arg(short, long)]
        json: Option<PathBuf>,
    },
}

pub async fn run(ops: &OpsClient, args: &VercelArgs, format: &OutputFormat) -> anyhow::Result<()> {
    match &args.command {
        VercelCommand::Projects { verbose, json } => {
            let projects = ops.projects().await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&projects)?),
                OutputFormat::Text => {
                    println!("{} projects:", projects.len());
                    for project in &projects {
                        let framework = project.framework.as_deref().unwrap_or("-");
                        println!("\n  {} ({}) framework: {framework}", project.name, project.id);
                        let shown = if *verbose {
                            project.latest_deployments.as_slice()
                        } else {
                            &project.latest_deployments[..project.latest_deployments.len().min(1)]
                        };
                        if shown.is_empty() {
                            println!("    no deployments");
                        }
                        for deployment in shown {
                            println!("    {}", deployment_line(deployment));
                        }
                    }
                }
            }
            if let Some(path) = json {
                render::write_json(path, &projects)?;
                println!("Saved {}", path.display());
            }
        }
        VercelCommand::Deployments {
            project,
            limit,
            json,
            success,
        } => {
            let listing = ops.deployments(project, *limit, *success).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
                OutputFormat::Text => {
                    if *success {
                        println!(
                            "{} of {} deployments of {} succeeded:",
                            listing.deployments.len(),
                            listing.total,
                            listing.project.name
                        );
                    } else {
                        println!(
                            "{} deployments of {}:",
                            listing.deployments.len(),
                            listing.project.name
                        );
                    }
                    let rows: Vec<_> = listing
                        .deployments
                        .iter()
                        .map(|d| {
                            vec![
                                d.id.clone(),
                                d.state().unwrap_or("-").to_string(),
                                d.target.clone().unwrap_or_else(|| "-".into()),
                                format_ms(d.created_at_ms()),
                                d.url.clone().unwrap_or_else(|| "-".into()),
                            ]
                        })
                        .collect();
                    print!(
                        "{}",
                        render::table(&["Id", "State", "Target", "Created", "Url"], &rows)
                    );
                }
            }
            if let Some(path) = json {
                render::write_json(path, &listing.deployments)?;
                println!("Saved {}", path.display());
            }
        }
        VercelCommand::Logs {
            project,
            deployment,
            kind,
            limit,
            json,
        } => {
            let target = match (deployment, project) {
                (Some(id), _) => LogTarget::Deployment(id.clone()),
                (None, Some(name)) => LogTarget::Project(name.clone()),
                (None, None) => anyhow::bail!("either --project or --deployment is required"),
            };
            let logs = ops.deployment_logs(&target, kind.as_deref(), *limit).await?;
            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&logs)?),
                OutputFormat::Text => print_logs(&logs),
            }
            if let Some(path) = json {
                render::write_json(path, &logs.events)?;
                println!("Saved {}", path.display());
            }
        }
    }
    Ok(())
}

fn deployment_line(deployment: &Deployment) -> String {
    format!(
        "{} {} {} {}",
        deployment.state().unwrap_or("UNKNOWN"),
        deployment.id,
        format_ms(deployment.created_at_ms()),
        deployment.url.as_deref().unwrap_or("")
    )
    .trim_end()
    .to_string()
}

fn format_ms(ms: i64) -> String {
    if ms == 0 {
        return "-".to_string();
    }
    DateTime::from_timestamp_millis(ms)
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Display sections, in order: errors, state changes, output, then the rest.
const SECTIONS: [(&str, &str); 3] = [
    ("error", "Errors"),
    ("deployment-state", "State changes"),
    ("stdout", "Output"),
];

fn print_logs(logs: &DeploymentLogs) {
    match &logs.project {
        Some(project) => println!("Logs for {project} (deployment {})", logs.deployment_id),
        None => println!("Logs for deployment {}", logs.deployment_id),
    }
    println!("Showing {} of {} events", logs.events.len(), logs.total);

    for (kind, title) in SECTIONS {
        let events: Vec<_> = logs.events.iter().filter(|e| e.kind == kind).collect();
        if events.is_empty() {
            continue;
        }
        println!("\n{title}:");
        for event in events {
            println!("{}", event_line(event));
        }
    }

    let other: Vec<_> = logs
        .events
        .iter()
        .filter(|e| SECTIONS.iter().all(|(kind, _)| e.kind != *kind))
        .collect();
    if !other.is_empty() {
        println!("\nOther:");
        for event in other {
            println!("{}", event_line(event));
        }
    }
}

fn event_line(event: &DeploymentEvent) -> String {
    let time = format_ms(event.created_at_ms());
    let body = match event.kind.as_str() {
        "error" => {
            let message = event.error_message().or(event.text()).unwrap_or("(no message)");
            match event.error_stack() {
                Some(stack) => format!("{message}\n{stack}"),
                None => message.to_string(),
            }
        }
        "deployment-state" => format!("state: {}", event.state().unwrap_or("-")),
        _ => event.text().unwrap_or_default().to_string(),
    };
    format!("  [{time}] {}: {body}", event.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timestamps_render_in_utc() {
        assert_eq!(format_ms(1_714_564_800_000), "2024-05-01 12:00:00");
        assert_eq!(format_ms(0), "-");
    }

    #[test]
    fn error_events_show_message_and_stack() {
        let event: DeploymentEvent = serde_json::from_value(json!({
            "type": "error",
            "created": 1_714_564_800_000_i64,
            "payload": {"error": {"message": "Build failed", "stack": "at step 2"}}
        }))
        .unwrap();
        assert_eq!(
            event_line(&event),
            "  [2024-05-01 12:00:00] error: Build failed\nat step 2"
        );
    }

    #[test]
    fn state_events_show_state() {
        let event: DeploymentEvent = serde_json::from_value(json!({
            "type": "deployment-state",
            "payload": {"state": "READY"}
        }))
        .unwrap();
        assert_eq!(event_line(&event), "  [-] deployment-state: state: READY");
    }

    #[test]
    fn deployment_line_without_url() {
        let deployment: Deployment =
            serde_json::from_value(json!({"id": "dpl_1", "readyState": "READY"})).unwrap();
        assert_eq!(deployment_line(&deployment), "READY dpl_1 -");
    }
}
