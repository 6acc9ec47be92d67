//! Deployment-platform operations: project lookup, deployment selection, logs.

use std::cmp::Reverse;

use serde::Serialize;
use sitepulse_core::{Deployment, DeploymentEvent, Project};

use crate::{OpsClient, OpsError};

/// Deployments consulted when picking the active one for a project.
pub const ACTIVE_CANDIDATES: u32 = 10;

/// Events shown when no limit is given.
pub const DEFAULT_EVENT_LIMIT: usize = 100;

/// Keep only deployments in a successful state.
pub fn successful(deployments: Vec<Deployment>) -> Vec<Deployment> {
    deployments.into_iter().filter(Deployment::is_ready).collect()
}

/// The deployment currently serving a project.
///
/// Prefers the newest ready production deployment, then the newest ready
/// one, then simply the newest. `deployments` is ordered newest first.
pub fn select_active(deployments: &[Deployment]) -> Option<&Deployment> {
    deployments
        .iter()
        .find(|d| d.is_ready() && d.is_production())
        .or_else(|| deployments.iter().find(|d| d.is_ready()))
        .or_else(|| deployments.first())
}

/// Filter events by type, keep the newest `limit`, and return them oldest first.
pub fn select_events(
    mut events: Vec<DeploymentEvent>,
    kind: Option<&str>,
    limit: usize,
) -> Vec<DeploymentEvent> {
    if let Some(kind) = kind {
        events.retain(|event| event.kind.eq_ignore_ascii_case(kind));
    }
    events.sort_by_key(|event| Reverse(event.created_at_ms()));
    events.truncate(limit);
    events.reverse();
    events
}

/// Which deployment's logs to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    /// A specific deployment id.
    Deployment(String),
    /// The active deployment of a project (id or name).
    Project(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentListing {
    pub project: Project,
    /// Deployments returned before success filtering.
    pub total: usize,
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentLogs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub deployment_id: String,
    /// Events returned before filtering.
    pub total: usize,
    pub events: Vec<DeploymentEvent>,
}

impl OpsClient {
    /// All projects, each with its latest deployments.
    pub async fn projects(&self) -> Result<Vec<Project>, OpsError> {
        Ok(self.deploy().await?.projects().await?)
    }

    /// Look a project up by id, then by name.
    pub async fn resolve_project(&self, id_or_name: &str) -> Result<Project, OpsError> {
        let client = self.deploy().await?;
        match client.project(id_or_name).await {
            Ok(project) => return Ok(project),
            Err(e) if e.status() == Some(404) => {
                tracing::debug!(project = id_or_name, "no project with that id, searching by name");
            }
            Err(e) => return Err(e.into()),
        }

        client
            .projects()
            .await?
            .into_iter()
            .find(|project| project.name == id_or_name)
            .ok_or_else(|| OpsError::NotFound(format!("project {id_or_name}")))
    }

    /// Recent deployments of a project, optionally only successful ones.
    pub async fn deployments(
        &self,
        project: &str,
        limit: u32,
        success_only: bool,
    ) -> Result<DeploymentListing, OpsError> {
        let project = self.resolve_project(project).await?;
        let deployments = self
            .deploy()
            .await?
            .deployments(&project.id, limit)
            .await?;
        let total = deployments.len();
        let deployments = if success_only {
            successful(deployments)
        } else {
            deployments
        };

        Ok(DeploymentListing {
            project,
            total,
            deployments,
        })
    }

    /// Build and runtime events of a deployment.
    pub async fn deployment_logs(
        &self,
        target: &LogTarget,
        kind: Option<&str>,
        limit: Option<usize>,
    ) -> Result<DeploymentLogs, OpsError> {
        let client = self.deploy().await?;
        let (project, deployment_id) = match target {
            LogTarget::Deployment(id) => (None, id.clone()),
            LogTarget::Project(name) => {
                let project = self.resolve_project(name).await?;
                let candidates = client.deployments(&project.id, ACTIVE_CANDIDATES).await?;
                let active = select_active(&candidates).ok_or_else(|| {
                    OpsError::NotFound(format!("deployments for project {}", project.name))
                })?;
                (Some(project.name), active.id.clone())
            }
        };

        let events = client.deployment_events(&deployment_id).await?;
        let total = events.len();
        let events = select_events(events, kind, limit.unwrap_or(DEFAULT_EVENT_LIMIT));

        Ok(DeploymentLogs {
            project,
            deployment_id,
            total,
            events,
        })
    }
}
