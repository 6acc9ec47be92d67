//! Optional on-disk record of every API exchange.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use sitepulse_core::ApiLogEntry;

use crate::Error;

/// Writes one JSON file per request/response pair under `<base>/<service>/`.
///
/// Write failures are reported through `tracing` and never reach the caller.
#[derive(Debug, Clone)]
pub struct ApiLogger {
    service: String,
    dir: PathBuf,
    enabled: bool,
    sequence: Arc<AtomicU64>,
}

impl ApiLogger {
    pub fn new(service: impl Into<String>, base_dir: impl AsRef<Path>, enabled: bool) -> Self {
        let service = service.into();
        Self {
            dir: base_dir.as_ref().join(&service),
            service,
            enabled,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A logger that never writes.
    pub fn disabled(service: impl Into<String>) -> Self {
        Self::new(service, "api_log", false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Directory the entries for this service land in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist one exchange. No-op when disabled.
    pub async fn record(&self, endpoint: &str, params: &Value, outcome: &Result<Value, Error>) {
        if !self.enabled {
            return;
        }

        let entry = match outcome {
            Ok(response) => {
                ApiLogEntry::success(&self.service, endpoint, params.clone(), response.clone())
            }
            Err(e) => ApiLogEntry::failure(&self.service, endpoint, params.clone(), e.to_string()),
        };

        match self.write(&entry).await {
            Ok(path) => tracing::debug!(path = %path.display(), "recorded API exchange"),
            Err(e) => tracing::warn!(
                service = %self.service,
                endpoint,
                error = %e,
                "failed to write API debug log"
            ),
        }
    }

    async fn write(&self, entry: &ApiLogEntry) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let salt = self.sequence.fetch_add(1, Ordering::Relaxed);
        let path = self.dir.join(entry.file_name(salt));
        let body = serde_json::to_vec_pretty(entry).map_err(std::io::Error::other)?;
        tokio::fs::write(&path, body).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|entries| entries.filter_map(|e| e.ok().map(|e| e.path())).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn writes_one_file_per_exchange() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = ApiLogger::new("plausible", tmp.path(), true);

        let params = json!({"site_id": "example.com"});
        logger
            .record("/v1/sites", &params, &Ok(json!({"sites": []})))
            .await;
        logger
            .record(
                "/v1/sites",
                &params,
                &Err(Error::Api {
                    status: 401,
                    body: "nope".into(),
                }),
            )
            .await;

        let files = files_in(&tmp.path().join("plausible"));
        assert_eq!(files.len(), 2);

        let mut successes = 0;
        for file in files {
            let entry: ApiLogEntry =
                serde_json::from_slice(&std::fs::read(&file).unwrap()).unwrap();
            assert_eq!(entry.service, "plausible");
            assert_eq!(entry.endpoint, "/v1/sites");
            if entry.success {
                successes += 1;
                assert_eq!(entry.response, Some(json!({"sites": []})));
            } else {
                assert_eq!(entry.error.as_deref(), Some("HTTP 401: nope"));
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn disabled_logger_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let logger = ApiLogger::new("vercel", tmp.path(), false);
        logger.record("/v9/projects", &json!({}), &Ok(json!([]))).await;
        assert!(!tmp.path().join("vercel").exists());
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where the directory should be.
        let blocker = tmp.path().join("blocked");
        std::fs::write(&blocker, b"x").unwrap();
        let logger = ApiLogger::new("plausible", &blocker, true);
        logger.record("/v1/sites", &json!({}), &Ok(json!([]))).await;
        assert!(blocker.is_file());
    }
}
