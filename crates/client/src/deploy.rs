//! Vercel deployment-platform client.

use std::time::Duration;

use futures::future::join_all;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use reqwest::Client;
use sitepulse_core::{Deployment, DeploymentEvent, Project};

use crate::Error;
use crate::debug_log::ApiLogger;
use crate::transport::{DEFAULT_TIMEOUT, Transport, decode, decode_list};

/// Public Vercel API root.
pub const DEFAULT_BASE_URL: &str = "https://api.vercel.com";

/// Deployments fetched for a project whose detail carries none.
const FALLBACK_DEPLOYMENTS: u32 = 5;

/// HTTP client for the Vercel REST API.
#[derive(Debug, Clone)]
pub struct VercelClient {
    transport: Transport,
}

/// Builder for configuring a [`VercelClient`].
#[derive(Debug)]
pub struct VercelClientBuilder {
    base_url: String,
    timeout: Duration,
    token: Option<String>,
    client: Option<Client>,
    logger: Option<ApiLogger>,
}

impl VercelClientBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            token: None,
            client: None,
            logger: None,
        }
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    #[must_use]
    pub fn logger(mut self, logger: ApiLogger) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> Result<VercelClient, Error> {
        let logger = self.logger.unwrap_or_else(|| ApiLogger::disabled("vercel"));
        Ok(VercelClient {
            transport: Transport::new(
                self.base_url,
                self.token,
                self.timeout,
                self.client,
                logger,
            )?,
        })
    }
}

impl VercelClient {
    pub fn builder(base_url: impl Into<String>) -> VercelClientBuilder {
        VercelClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// List projects, each enriched with its detail record.
    ///
    /// Projects whose detail carries no deployments get the latest few
    /// fetched separately. A project whose detail cannot be loaded is
    /// returned as listed.
    pub async fn projects(&self) -> Result<Vec<Project>, Error> {
        let body = self
            .transport
            .get("/v9/projects", &[("limit", "100".to_string())])
            .await?;
        let projects: Vec<Project> = decode_list(body, "projects")?;

        Ok(join_all(projects.into_iter().map(|project| self.enrich(project))).await)
    }

    async fn enrich(&self, project: Project) -> Project {
        let mut detail = match self.project(&project.id).await {
            Ok(detail) => detail,
            Err(e) => {
                tracing::warn!(project = %project.name, error = %e, "could not fetch project details");
                return project;
            }
        };

        if detail.latest_deployments.is_empty() {
            match self.deployments(&detail.id, FALLBACK_DEPLOYMENTS).await {
                Ok(deployments) => detail.latest_deployments = deployments,
                Err(e) => tracing::warn!(
                    project = %detail.name,
                    error = %e,
                    "could not fetch latest deployments"
                ),
            }
        }
        detail
    }

    /// Fetch one project by id (or by name; the API accepts both).
    pub async fn project(&self, id_or_name: &str) -> Result<Project, Error> {
        let path = format!("/v9/projects/{}", encode_segment(id_or_name));
        let body = self.transport.get(&path, &[]).await?;
        decode(body)
    }

    /// Most recent deployments of a project, newest first.
    pub async fn deployments(&self, project_id: &str, limit: u32) -> Result<Vec<Deployment>, Error> {
        let params = [
            ("projectId", project_id.to_string()),
            ("limit", limit.to_string()),
        ];
        let body = self.transport.get("/v6/deployments", &params).await?;
        decode_list(body, "deployments")
    }

    /// Build and runtime events of a deployment.
    pub async fn deployment_events(&self, deployment_id: &str) -> Result<Vec<DeploymentEvent>, Error> {
        let path = format!("/v2/deployments/{}/events", encode_segment(deployment_id));
        let body = self.transport.get(&path, &[]).await?;
        decode_list(body, "logs")
    }
}

/// Characters escaped inside a single URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
