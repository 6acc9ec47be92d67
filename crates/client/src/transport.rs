use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::Error;
use crate::debug_log::ApiLogger;

/// Default request timeout.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated JSON-over-HTTP exchange shared by both provider clients.
///
/// Every call is one request with no retry. When the debug logger is
/// enabled each exchange is recorded after it completes.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    client: Client,
    base_url: String,
    token: Option<String>,
    logger: ApiLogger,
}

impl Transport {
    pub(crate) fn new(
        base_url: String,
        token: Option<String>,
        timeout: Duration,
        client: Option<Client>,
        logger: ApiLogger,
    ) -> Result<Self, Error> {
        let client = match client {
            Some(c) => c,
            None => Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Configuration(e.to_string()))?,
        };
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            logger,
        })
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Add authorization header if a token is set.
    fn add_auth(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub(crate) async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, Error> {
        let url = format!("{}{path}", self.base_url);
        let logged: Map<String, Value> = params
            .iter()
            .map(|(k, v)| ((*k).to_string(), Value::String(v.clone())))
            .collect();
        let request = self.client.get(&url).query(params);
        self.exchange(path, Value::Object(logged), request).await
    }

    pub(crate) async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Value, Error> {
        let url = format!("{}{path}", self.base_url);
        let logged = serde_json::to_value(body).map_err(|e| Error::Decode(e.to_string()))?;
        let request = self.client.post(&url).json(&logged);
        self.exchange(path, logged, request).await
    }

    async fn exchange(&self, path: &str, params: Value, request: RequestBuilder) -> Result<Value, Error> {
        let outcome = self.send(request).await;
        match &outcome {
            Ok(_) => tracing::debug!(base = %self.base_url, path, "request succeeded"),
            Err(e) => tracing::debug!(base = %self.base_url, path, error = %e, "request failed"),
        }
        self.logger.record(path, &params, &outcome).await;
        outcome
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, Error> {
        let response = self
            .add_auth(request)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Convert a raw JSON body into the expected response type.
pub(crate) fn decode<T: DeserializeOwned>(value: Value) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|e| Error::Decode(e.to_string()))
}

/// Accept either a bare array or an object wrapping the array under `key`.
pub(crate) fn decode_list<T: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<T>, Error> {
    match value {
        Value::Object(mut map) => match map.remove(key) {
            Some(list) => decode(list),
            None => Err(Error::Decode(format!("expected an array or an object with '{key}'"))),
        },
        other => decode(other),
    }
}
