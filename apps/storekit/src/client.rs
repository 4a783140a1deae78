//! # REST Transport
//!
//! Performs datapoint requests against the REST API. A fetch store's
//! control callback hands its params to a [`Transport`]; [`RestClient`] is
//! the production implementation.
//!
//! Paths are `<api_url>/<namespace>/<module>/<endpoint>`. GET sends params
//! as the query string, POST sends `{"data": params}` as JSON.

use crate::config::HttpMethod;
use serde_json::{Value, json};
use std::sync::Arc;
use storekit_core::{BoxFuture, Params, ServiceError};

/// Error code for requests that never got a response.
pub const FETCH_ERROR: &str = "fetch_error";

/// One request to the API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub module: String,
    pub endpoint: String,
    pub params: Params,
}

/// Anything that can answer an [`ApiRequest`].
pub trait Transport: Send + Sync {
    fn request(&self, request: ApiRequest) -> BoxFuture<'static, Result<Value, ServiceError>>;
}

/// Shared transport handle.
pub type SharedTransport = Arc<dyn Transport>;

// =============================================================================
// REST CLIENT
// =============================================================================

/// HTTP transport backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    namespace: String,
}

impl RestClient {
    /// Create a client for `base_url` and route `namespace`.
    pub fn new(base_url: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            namespace: namespace.into().trim_matches('/').to_string(),
        }
    }

    /// Full URL of a datapoint.
    #[must_use]
    pub fn url(&self, module: &str, endpoint: &str) -> String {
        if self.namespace.is_empty() {
            format!("{}/{}/{}", self.base_url, module, endpoint)
        } else {
            format!("{}/{}/{}/{}", self.base_url, self.namespace, module, endpoint)
        }
    }

    async fn send(self, request: ApiRequest) -> Result<Value, ServiceError> {
        let url = self.url(&request.module, &request.endpoint);
        let builder = match request.method {
            HttpMethod::Get => self.http.get(&url).query(&query_pairs(&request.params)),
            HttpMethod::Post => self.http.post(&url).json(&json!({ "data": request.params })),
        };
        tracing::debug!(method = request.method.as_str(), %url, "api request");
        let response = builder.send().await.map_err(|e| {
            ServiceError::new(FETCH_ERROR, format!("Cannot reach {url}: {e}"))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ServiceError::new(FETCH_ERROR, format!("Failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            tracing::debug!(%url, status = status.as_u16(), "api error response");
            return Err(error_from_body(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ServiceError::new("invalid_json", format!("Response is not JSON: {e}"))
                .with_data(json!({ "status": status.as_u16() }))
        })
    }
}

impl Transport for RestClient {
    fn request(&self, request: ApiRequest) -> BoxFuture<'static, Result<Value, ServiceError>> {
        Box::pin(self.clone().send(request))
    }
}

// =============================================================================
// HELPERS
// =============================================================================

/// Query string pairs. Strings go as-is, everything else as JSON.
#[must_use]
pub fn query_pairs(params: &Params) -> Vec<(String, String)> {
    params
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (key.clone(), rendered)
        })
        .collect()
}

/// Turn an error response into a `ServiceError`.
///
/// Bodies in the REST error shape are kept; `data.status` is filled in when
/// absent.
#[must_use]
pub fn error_from_body(status: u16, body: &str) -> ServiceError {
    let parsed = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| ServiceError::from_value(&value));

    match parsed {
        Some(mut error) => {
            if error.data.is_null() {
                error.data = json!({ "status": status });
            } else if let Some(data) = error.data.as_object_mut() {
                data.entry("status").or_insert(json!(status));
            }
            error
        }
        None => ServiceError::new("http_error", format!("HTTP {status}"))
            .with_data(json!({ "status": status })),
    }
}

// =============================================================================
// TESTS
// =============================================================================
