//! Configuration for the operations layer.

use std::path::PathBuf;
use std::time::Duration;

/// Connection settings for one remote provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API root, e.g. `https://plausible.io/api`.
    pub base_url: String,
    /// Environment variable the credential is read from.
    pub credential_env: String,
    /// Secret-manager reference used when the variable is unset.
    pub secret_reference: String,
    /// Credential taken from the environment, if any.
    pub credential: Option<String>,
}

impl ProviderConfig {
    fn from_lookup(
        lookup: &impl Fn(&str) -> Option<String>,
        url_env: &str,
        default_url: &str,
        credential_env: &str,
        secret_reference: &str,
    ) -> Self {
        Self {
            base_url: lookup(url_env).unwrap_or_else(|| default_url.to_string()),
            credential_env: credential_env.to_string(),
            secret_reference: secret_reference.to_string(),
            credential: lookup(credential_env).filter(|v| !v.trim().is_empty()),
        }
    }
}

/// Configuration shared by the CLI and the MCP server.
#[derive(Debug, Clone)]
pub struct OpsConfig {
    pub plausible: ProviderConfig,
    pub vercel: ProviderConfig,
    /// Persist every API exchange under [`OpsConfig::log_dir`].
    pub api_debug: bool,
    /// Root of the debug-log tree; one subdirectory per service.
    pub log_dir: PathBuf,
    /// Request timeout.
    pub timeout: Option<Duration>,
    /// Most pages one paginated breakdown may follow.
    pub max_pages: u32,
    /// Secret-manager executable, invoked as `<program> read <reference>`.
    pub secret_program: String,
}

pub const PLAUSIBLE_URL_ENV: &str = "PLAUSIBLE_API_URL";
pub const PLAUSIBLE_KEY_ENV: &str = "PLAUSIBLE_API_KEY";
pub const VERCEL_URL_ENV: &str = "VERCEL_API_URL";
pub const VERCEL_TOKEN_ENV: &str = "VERCEL_API_TOKEN";
pub const API_DEBUG_ENV: &str = "API_DEBUG";
pub const LOG_DIR_ENV: &str = "SITEPULSE_API_LOG_DIR";
pub const TIMEOUT_ENV: &str = "SITEPULSE_TIMEOUT_SECS";
pub const MAX_PAGES_ENV: &str = "SITEPULSE_MAX_PAGES";

const PLAUSIBLE_SECRET: &str = "op://Development/plausible api/notesPlain";
const VERCEL_SECRET: &str = "op://Development/vercel api/notesPlain";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_PAGES: u32 = 100;

impl OpsConfig {
    /// Create configuration from environment variables.
    ///
    /// Reads:
    /// - `PLAUSIBLE_API_URL` (default `https://plausible.io/api`)
    /// - `PLAUSIBLE_API_KEY` (optional; falls back to the secret manager)
    /// - `VERCEL_API_URL` (default `https://api.vercel.com`)
    /// - `VERCEL_API_TOKEN` (optional; falls back to the secret manager)
    /// - `API_DEBUG` (`1` or `true` enables debug logging)
    /// - `SITEPULSE_API_LOG_DIR` (default `./api_log`)
    /// - `SITEPULSE_TIMEOUT_SECS` (default 30)
    /// - `SITEPULSE_MAX_PAGES` (default 100)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OpsConfig::from_env`] with an explicit variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let plausible = ProviderConfig::from_lookup(
            &lookup,
            PLAUSIBLE_URL_ENV,
            sitepulse_client::plausible::DEFAULT_BASE_URL,
            PLAUSIBLE_KEY_ENV,
            PLAUSIBLE_SECRET,
        );
        let vercel = ProviderConfig::from_lookup(
            &lookup,
            VERCEL_URL_ENV,
            sitepulse_client::deploy::DEFAULT_BASE_URL,
            VERCEL_TOKEN_ENV,
            VERCEL_SECRET,
        );
        let timeout = lookup(TIMEOUT_ENV)
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let max_pages = lookup(MAX_PAGES_ENV)
            .and_then(|s| s.trim().parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_PAGES);

        Self {
            plausible,
            vercel,
            api_debug: lookup(API_DEBUG_ENV).is_some_and(|v| is_truthy(&v)),
            log_dir: lookup(LOG_DIR_ENV).map_or_else(|| PathBuf::from("api_log"), PathBuf::from),
            timeout: Some(Duration::from_secs(timeout)),
            max_pages,
            secret_program: "op".to_string(),
        }
    }

    /// Override the Plausible API root.
    #[must_use]
    pub fn with_plausible_url(mut self, url: impl Into<String>) -> Self {
        self.plausible.base_url = url.into();
        self
    }

    /// Override the Plausible API key.
    #[must_use]
    pub fn with_plausible_key(mut self, key: impl Into<String>) -> Self {
        self.plausible.credential = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_vercel_url(mut self, url: impl Into<String>) -> Self {
        self.vercel.base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_vercel_token(mut self, token: impl Into<String>) -> Self {
        self.vercel.credential = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_api_debug(mut self, enabled: bool) -> Self {
        self.api_debug = enabled;
        self
    }

    #[must_use]
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = dir.into();
        self
    }

    /// Override the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    #[must_use]
    pub fn with_secret_program(mut self, program: impl Into<String>) -> Self {
        self.secret_program = program.into();
        self
    }
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// `1` and `true` (any case) switch a flag on.
pub fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true")
}
