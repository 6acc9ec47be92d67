use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// One recorded API exchange, written by the debug logger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiLogEntry {
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub endpoint: String,
    pub params: Value,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub success: bool,
}

impl ApiLogEntry {
    pub fn success(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        params: Value,
        response: Value,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            service: service.into(),
            endpoint: endpoint.into(),
            params,
            response: Some(response),
            error: None,
            success: true,
        }
    }

    pub fn failure(
        service: impl Into<String>,
        endpoint: impl Into<String>,
        params: Value,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            service: service.into(),
            endpoint: endpoint.into(),
            params,
            response: None,
            error: Some(error.into()),
            success: false,
        }
    }

    /// `<timestamp>_<service>_<endpoint>_<hash8>.json`
    ///
    /// The timestamp contains no `:` and the endpoint no `/`, so the name is
    /// a single path component. `salt` separates entries written within the
    /// same instant.
    pub fn file_name(&self, salt: u64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.endpoint.as_bytes());
        hasher.update(self.params.to_string().as_bytes());
        hasher.update(
            self.timestamp
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        hasher.update(salt.to_le_bytes());
        let digest = hex::encode(hasher.finalize());

        format!(
            "{}_{}_{}_{}.json",
            self.timestamp.format("%Y-%m-%dT%H-%M-%S%.3fZ"),
            self.service,
            self.endpoint.trim_start_matches('/').replace('/', "_"),
            &digest[..8],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_name_is_a_single_component() {
        let entry = ApiLogEntry::success(
            "plausible",
            "/v1/stats/breakdown",
            json!({"site_id": "a.com"}),
            json!({"results": []}),
        );
        let name = entry.file_name(0);
        assert!(!name.contains(':'));
        assert!(!name.contains('/'));
        assert!(name.ends_with(".json"));
        assert!(name.contains("_plausible_v1_stats_breakdown_"));
    }

    #[test]
    fn salt_distinguishes_entries() {
        let entry = ApiLogEntry::failure("vercel", "/v9/projects", json!({}), "boom");
        assert_ne!(entry.file_name(1), entry.file_name(2));
    }

    #[test]
    fn failure_serializes_error_message() {
        let entry = ApiLogEntry::failure("vercel", "/v9/projects", json!({}), "HTTP 500");
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["success"], json!(false));
        assert_eq!(json["error"], json!("HTTP 500"));
        assert_eq!(json["response"], Value::Null);
    }
}
