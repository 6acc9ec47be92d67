//! Error types for the sitepulse HTTP clients.

use thiserror::Error;

/// Errors that can occur when talking to a remote provider.
#[derive(Debug, Error)]
pub enum Error {
    /// The provider answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// Network failure (connect, DNS, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not JSON or did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// Client configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A paginated fetch reported more pages than the client is allowed to
    /// follow.
    #[error("result spans {total_pages} pages, more than the limit of {max_pages}")]
    PageLimitExceeded {
        /// Pages reported by the provider.
        total_pages: u32,
        /// Configured cap.
        max_pages: u32,
    },
}

impl Error {
    /// Returns `true` if the provider rejected the request.
    pub fn is_api_error(&self) -> bool {
        matches!(self, Self::Api { .. })
    }

    /// Returns `true` if the request never got a response.
    pub fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
