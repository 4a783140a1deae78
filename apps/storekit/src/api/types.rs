//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use crate::dashboard::Datapoint;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use storekit_core::{ServiceError, StoreError};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ARGUMENTS
// =============================================================================

/// Body of `POST /select/{selector}` and `POST /actions/{action}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArgsRequest {
    #[serde(default)]
    pub args: Vec<Value>,
}

/// Body of `POST /invalidate/{selector}`.
///
/// Without `args` every resolution of the selector is invalidated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InvalidateRequest {
    #[serde(default)]
    pub args: Option<Vec<Value>>,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Result of a resolving select.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectResponse {
    pub selector: String,
    pub value: Value,
}

/// Result of a dispatched action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResponse {
    pub action: String,
    pub result: Value,
}

/// Result of an invalidation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidateResponse {
    pub selector: String,
    /// `true` when only one argument list was invalidated.
    pub keyed: bool,
}

/// Recorded request failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorsResponse {
    /// Every keyed error, without duplicates.
    pub errors: Vec<ServiceError>,
    /// The legacy global error.
    pub error: Option<ServiceError>,
}

/// One configured datapoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatapointInfo {
    pub name: String,
    pub selector: String,
    pub fetch_action: String,
    pub is_fetching_selector: String,
    pub module: String,
    pub endpoint: String,
    pub method: String,
    pub params: Vec<String>,
    pub required: Vec<String>,
}

impl From<&Datapoint> for DatapointInfo {
    fn from(datapoint: &Datapoint) -> Self {
        let names = datapoint.store.names();
        Self {
            name: datapoint.config.name.clone(),
            selector: datapoint.selector_name().to_string(),
            fetch_action: names.fetch_action.clone(),
            is_fetching_selector: names.is_fetching_selector.clone(),
            module: datapoint.config.module.clone(),
            endpoint: datapoint.config.endpoint.clone(),
            method: datapoint.config.method.as_str().to_string(),
            params: datapoint.config.params.clone(),
            required: datapoint.config.required.clone(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Error body returned with every non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

impl From<&StoreError> for ErrorResponse {
    fn from(err: &StoreError) -> Self {
        let code = match err {
            StoreError::Validation(_) => "validation_error",
            StoreError::Composition(_) => "composition_error",
            StoreError::UnknownAction(_) => "unknown_action",
            StoreError::UnknownSelector(_) => "unknown_selector",
            StoreError::UnknownControl(_) => "unknown_control",
            StoreError::Reducer(_) => "reducer_error",
            StoreError::Service(service) => service.code.as_str(),
        };
        Self {
            code: code.to_string(),
            error: err.to_string(),
        }
    }
}
