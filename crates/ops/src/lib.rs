//! Common operations layer for the sitepulse CLI and MCP server.
//!
//! Wraps [`sitepulse_client::PlausibleClient`] and
//! [`sitepulse_client::VercelClient`] with configuration, credential
//! resolution, and the multi-request operations both front ends share.

mod config;
pub mod debug_logs;
pub mod deployments;
mod error;
mod secret;
pub mod stats;

pub use config::{OpsConfig, ProviderConfig, is_truthy};
pub use error::OpsError;
pub use secret::SecretResolver;

use std::sync::Arc;

use sitepulse_client::{ApiLogger, PlausibleClient, VercelClient};
use tokio::sync::OnceCell;

/// Re-export client and core types for consumers.
pub use sitepulse_client;
pub use sitepulse_core;

/// High-level operations client.
///
/// Carries the configuration and the lazily resolved credentials. Each
/// provider credential is resolved at most once, on first use, and each HTTP
/// client is built once and reused. Cloning is cheap and shares that state.
#[derive(Clone)]
pub struct OpsClient {
    inner: Arc<Inner>,
}

struct Inner {
    config: OpsConfig,
    plausible_key: SecretResolver,
    vercel_token: SecretResolver,
    plausible: OnceCell<PlausibleClient>,
    vercel: OnceCell<VercelClient>,
}

impl OpsClient {
    /// Create a new operations client from configuration.
    ///
    /// Nothing is contacted here; credentials are resolved by the first
    /// operation that needs them.
    pub fn from_config(config: OpsConfig) -> Result<Self, OpsError> {
        for (name, url) in [
            ("Plausible", &config.plausible.base_url),
            ("Vercel", &config.vercel.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(OpsError::Configuration(format!(
                    "{name} API URL must start with http:// or https://, got {url:?}"
                )));
            }
        }

        let plausible_key = SecretResolver::for_provider(&config.plausible, &config.secret_program);
        let vercel_token = SecretResolver::for_provider(&config.vercel, &config.secret_program);

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                plausible_key,
                vercel_token,
                plausible: OnceCell::new(),
                vercel: OnceCell::new(),
            }),
        })
    }

    pub fn config(&self) -> &OpsConfig {
        &self.inner.config
    }

    /// The analytics client, resolving the API key on first use.
    pub async fn analytics(&self) -> Result<&PlausibleClient, OpsError> {
        let inner = &*self.inner;
        inner
            .plausible
            .get_or_try_init(|| async {
                let key = inner.plausible_key.resolve().await?;
                let mut builder = PlausibleClient::builder(&inner.config.plausible.base_url)
                    .api_key(key)
                    .max_pages(inner.config.max_pages)
                    .logger(self.logger("plausible"));
                if let Some(timeout) = inner.config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder
                    .build()
                    .map_err(|e| OpsError::Configuration(e.to_string()))
            })
            .await
    }

    /// The deployment-platform client, resolving the token on first use.
    pub async fn deploy(&self) -> Result<&VercelClient, OpsError> {
        let inner = &*self.inner;
        inner
            .vercel
            .get_or_try_init(|| async {
                let token = inner.vercel_token.resolve().await?;
                let mut builder = VercelClient::builder(&inner.config.vercel.base_url)
                    .token(token)
                    .logger(self.logger("vercel"));
                if let Some(timeout) = inner.config.timeout {
                    builder = builder.timeout(timeout);
                }
                builder
                    .build()
                    .map_err(|e| OpsError::Configuration(e.to_string()))
            })
            .await
    }

    fn logger(&self, service: &str) -> ApiLogger {
        let config = &self.inner.config;
        ApiLogger::new(service, &config.log_dir, config.api_debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OpsConfig {
        OpsConfig::from_lookup(|_| None)
            .with_plausible_key("pk")
            .with_vercel_token("vt")
    }

    #[test]
    fn rejects_url_without_scheme() {
        let err = OpsClient::from_config(config().with_plausible_url("plausible.io/api"))
            .err()
            .unwrap();
        assert!(matches!(err, OpsError::Configuration(_)));
    }

    #[tokio::test]
    async fn clients_are_built_once() {
        let ops = OpsClient::from_config(config().with_max_pages(7)).unwrap();
        let first = ops.analytics().await.unwrap();
        assert!(first.is_authenticated());
        assert_eq!(first.max_pages(), 7);
        assert_eq!(first.base_url(), "https://plausible.io/api");

        let second = ops.analytics().await.unwrap();
        assert!(std::ptr::eq(first, second));

        let deploy = ops.deploy().await.unwrap();
        assert_eq!(deploy.base_url(), "https://api.vercel.com");
    }

    #[tokio::test]
    async fn missing_credential_surfaces_on_first_use() {
        let config = OpsConfig::from_lookup(|_| None)
            .with_secret_program("sitepulse-no-such-secret-manager");
        let ops = OpsClient::from_config(config).unwrap();
        let err = ops.analytics().await.err().unwrap();
        assert!(
            matches!(err, OpsError::CredentialUnavailable { ref env_var, .. } if env_var == "PLAUSIBLE_API_KEY")
        );
    }
}
