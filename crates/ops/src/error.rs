//! Error types for the operations layer.

use sitepulse_core::QueryError;
use thiserror::Error;

/// Errors from the operations layer.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Neither the environment nor the secret manager produced a credential.
    #[error("could not get credential: set {env_var} or configure the secret manager ({cause})")]
    CredentialUnavailable {
        /// Environment variable that was consulted first.
        env_var: String,
        /// Why the secret-manager lookup failed.
        cause: String,
    },

    /// The query could not be expressed in the provider's schema.
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Error from the underlying HTTP client.
    #[error(transparent)]
    Client(#[from] sitepulse_client::Error),

    /// Local filesystem error (debug logs, `.env`).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A named site, project, or deployment does not exist.
    #[error("not found: {0}")]
    NotFound(String),
}
