//! Credential resolution: environment first, then an external secret manager.

use tokio::process::Command;
use tokio::sync::OnceCell;

use crate::config::ProviderConfig;
use crate::error::OpsError;

/// Resolves one provider credential and caches it for the process lifetime.
///
/// The environment value wins when set. Otherwise the secret manager is asked
/// once via `<program> read <reference>`; its trimmed stdout becomes the
/// credential.
#[derive(Debug)]
pub struct SecretResolver {
    env_var: String,
    reference: String,
    program: String,
    preset: Option<String>,
    cached: OnceCell<String>,
}

impl SecretResolver {
    pub fn new(
        env_var: impl Into<String>,
        reference: impl Into<String>,
        program: impl Into<String>,
        preset: Option<String>,
    ) -> Self {
        Self {
            env_var: env_var.into(),
            reference: reference.into(),
            program: program.into(),
            preset,
            cached: OnceCell::new(),
        }
    }

    /// Resolver for a provider's configured credential and secret reference.
    pub fn for_provider(provider: &ProviderConfig, program: &str) -> Self {
        Self::new(
            &provider.credential_env,
            &provider.secret_reference,
            program,
            provider.credential.clone(),
        )
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Return the credential, consulting the secret manager at most once.
    pub async fn resolve(&self) -> Result<&str, OpsError> {
        self.cached
            .get_or_try_init(|| self.fetch())
            .await
            .map(String::as_str)
    }

    async fn fetch(&self) -> Result<String, OpsError> {
        if let Some(value) = self
            .preset
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            return Ok(value.to_string());
        }

        tracing::info!(
            env_var = %self.env_var,
            program = %self.program,
            "credential not set in environment, asking secret manager"
        );

        let output = Command::new(&self.program)
            .arg("read")
            .arg(&self.reference)
            .output()
            .await
            .map_err(|e| self.unavailable(format!("could not run {}: {e}", self.program)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let secret = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if secret.is_empty() {
            return Err(self.unavailable("secret manager returned an empty value".to_string()));
        }
        Ok(secret)
    }

    fn unavailable(&self, cause: String) -> OpsError {
        OpsError::CredentialUnavailable {
            env_var: self.env_var.clone(),
            cause,
        }
    }
}
