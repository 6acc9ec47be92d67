//! Hosting-platform (Vercel) project and deployment records.

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Deployment states that count as a successful build.
pub const SUCCESS_STATES: &[&str] = &["READY", "COMPLETE", "SUCCESS"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub latest_deployments: Vec<Deployment>,
    #[serde(default)]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub updated_at: Option<Value>,
    #[serde(default)]
    pub link: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    #[serde(alias = "uid")]
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ready_state: Option<String>,
    /// Either epoch milliseconds or an ISO string, depending on the endpoint.
    #[serde(default)]
    pub created: Option<Value>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub creator: Option<Value>,
}

impl Deployment {
    /// Effective state: `readyState`, then `status`, then the legacy `state`.
    pub fn state(&self) -> Option<&str> {
        self.ready_state
            .as_deref()
            .or(self.status.as_deref())
            .or(self.state.as_deref())
    }

    pub fn is_ready(&self) -> bool {
        self.state()
            .is_some_and(|state| SUCCESS_STATES.iter().any(|ok| ok.eq_ignore_ascii_case(state)))
    }

    pub fn is_production(&self) -> bool {
        self.target.as_deref() == Some("production")
    }

    /// Creation time in epoch milliseconds, 0 when unknown.
    pub fn created_at_ms(&self) -> i64 {
        self.created
            .as_ref()
            .and_then(timestamp_ms)
            .or(self.created_at)
            .unwrap_or_default()
    }
}

/// Epoch milliseconds from either a number or an RFC 3339 string.
fn timestamp_ms(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s
            .parse::<i64>()
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|t| t.timestamp_millis())),
        _ => None,
    }
}

/// One build or runtime log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub created: Option<Value>,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub text: Option<String>,
}

impl DeploymentEvent {
    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .or_else(|| self.payload.get("text").and_then(Value::as_str))
    }

    pub fn error_message(&self) -> Option<&str> {
        self.payload
            .get("error")
            .and_then(|error| error.get("message"))
            .and_then(Value::as_str)
    }

    pub fn error_stack(&self) -> Option<&str> {
        self.payload
            .get("error")
            .and_then(|error| error.get("stack"))
            .and_then(Value::as_str)
    }

    /// State reported by a `deployment-state` event.
    pub fn state(&self) -> Option<&str> {
        self.payload.get("state").and_then(Value::as_str)
    }

    pub fn created_at_ms(&self) -> i64 {
        self.created
            .as_ref()
            .or_else(|| self.payload.get("date"))
            .and_then(timestamp_ms)
            .unwrap_or_default()
    }
}
