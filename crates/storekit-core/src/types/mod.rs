//! # Core Type Definitions
//!
//! This module contains the value types shared by every store fragment:
//! - State and parameter objects (`State`, `Params`)
//! - Action / effect descriptors (`Action`)
//! - Deferred work handed to the registry (`Dispatchable`, `Routine`)
//! - Request outcomes (`FetchResult`, `ServiceError`)
//! - Error types (`StoreError`)
//!
//! ## Representation
//!
//! State is a JSON object whose top-level keys are slices. Each slice is
//! owned by the fragment that declared it in its initial state.

use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

// =============================================================================
// STATE & PARAMETERS
// =============================================================================

/// The published store state: slice key -> slice value.
pub type State = Map<String, Value>;

/// A parameter object passed to a control callback and used for key derivation.
pub type Params = Map<String, Value>;

/// An owned, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// =============================================================================
// ACTION
// =============================================================================

/// An action object or effect descriptor: `{ type, payload }`.
///
/// Plain actions are folded into state by reducers. Effects are routed to
/// the control registered for their `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// The action type, e.g. `START_FETCH_GET_REPORT`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-form payload.
    #[serde(default)]
    pub payload: Value,
}

impl Action {
    /// Create a new action.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create an action without payload.
    #[must_use]
    pub fn bare(kind: impl Into<String>) -> Self {
        Self::new(kind, Value::Null)
    }

    /// Read a top-level payload field.
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    /// The `params` object of the payload, or an empty object.
    #[must_use]
    pub fn params(&self) -> Params {
        match self.field("params") {
            Some(Value::Object(params)) => params.clone(),
            _ => Params::new(),
        }
    }

    /// JSON form of the action.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "type": self.kind, "payload": self.payload })
    }
}

// =============================================================================
// DISPATCHABLE
// =============================================================================

/// Asynchronous work driven by the registry.
///
/// A routine receives an explicit registry handle and performs its effects
/// strictly in the order it awaits them.
pub type Routine = Box<dyn FnOnce(Registry) -> BoxFuture<'static, Result<Value, StoreError>> + Send>;

/// What an action creator hands back to the registry.
pub enum Dispatchable {
    /// A plain action, reduced synchronously.
    Action(Action),
    /// A routine, driven until completion.
    Routine(Routine),
}

impl Dispatchable {
    /// Wrap an async closure as a routine.
    pub fn routine<F, Fut>(f: F) -> Self
    where
        F: FnOnce(Registry) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Value, StoreError>> + Send + 'static,
    {
        Self::Routine(Box::new(move |registry| -> BoxFuture<'static, _> {
            Box::pin(f(registry))
        }))
    }

    /// Whether this is a plain action.
    #[must_use]
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Action(_))
    }
}

impl From<Action> for Dispatchable {
    fn from(action: Action) -> Self {
        Self::Action(action)
    }
}

impl fmt::Debug for Dispatchable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Action(action) => f.debug_tuple("Action").field(action).finish(),
            Self::Routine(_) => f.write_str("Routine(..)"),
        }
    }
}

// =============================================================================
// SERVICE ERROR
// =============================================================================

/// A request failure, in the REST error shape `{ code, message, data }`.
///
/// This is what the error sub-store records and what a failed fetch returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
#[error("{message} ({code})")]
pub struct ServiceError {
    /// Machine-readable error code.
    #[serde(default)]
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Additional error data (e.g. `{ "status": 404 }`).
    #[serde(default)]
    pub data: Value,
}

impl ServiceError {
    /// Create a new service error without data.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Attach error data.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// JSON form, as stored in state.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "code": self.code, "message": self.message, "data": self.data })
    }

    /// Parse a stored error. Returns `None` for anything without a message.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Service(service) => service,
            other => Self::new("internal_error", other.to_string()),
        }
    }
}

// =============================================================================
// FETCH RESULT
// =============================================================================

/// Outcome of a fetch routine. Exactly one field is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FetchResult {
    /// The resolved response on success.
    pub response: Option<Value>,
    /// The recorded error on failure.
    pub error: Option<ServiceError>,
}

impl FetchResult {
    /// A successful result.
    #[must_use]
    pub fn success(response: Value) -> Self {
        Self {
            response: Some(response),
            error: None,
        }
    }

    /// A failed result.
    #[must_use]
    pub fn failure(error: ServiceError) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }

    /// Check whether the request succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// JSON form: `{ "response": ..., "error": ... }`.
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({
            "response": self.response,
            "error": self.error.as_ref().map(ServiceError::to_value),
        })
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the store runtime.
///
/// Request failures are not raised through this type by fetch routines;
/// they are recorded and returned in `FetchResult`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Arguments or parameters were rejected before any dispatch.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A store could not be constructed or combined.
    #[error("Composition error: {0}")]
    Composition(String),

    /// No action creator with this name exists.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// No selector with this name exists.
    #[error("Unknown selector: {0}")]
    UnknownSelector(String),

    /// No control is registered for this effect type.
    #[error("No control registered for effect: {0}")]
    UnknownControl(String),

    /// A reducer refused an action.
    #[error("Reducer error: {0}")]
    Reducer(String),

    /// A control callback failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),
}

// =============================================================================
// TESTS
// =============================================================================
