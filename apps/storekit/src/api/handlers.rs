//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    types::{
        ActionResponse, ArgsRequest, DatapointInfo, ErrorResponse, ErrorsResponse, HealthResponse,
        InvalidateRequest, InvalidateResponse, SelectResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use storekit_core::StoreError;
use storekit_core::error_store::{get_error, get_errors};

/// Failure half of every fallible handler.
type ApiError = (StatusCode, Json<ErrorResponse>);

/// Map a store error to a status code and JSON body.
fn store_error(err: &StoreError) -> ApiError {
    let status = match err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::UnknownAction(_) | StoreError::UnknownSelector(_) => StatusCode::NOT_FOUND,
        StoreError::Service(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        tracing::error!(error = %err, "store operation failed");
    }
    (status, Json(ErrorResponse::from(err)))
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATE HANDLERS
// =============================================================================

/// The current published state.
pub async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.registry.state();
    (StatusCode::OK, Json(snapshot.as_ref().clone()))
}

/// Configured datapoints and their generated names.
pub async fn datapoints_handler(State(state): State<AppState>) -> impl IntoResponse {
    let datapoints: Vec<DatapointInfo> = state
        .dashboard
        .datapoints()
        .iter()
        .map(DatapointInfo::from)
        .collect();
    Json(datapoints)
}

/// Recorded request failures.
pub async fn errors_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.registry.state();
    Json(ErrorsResponse {
        errors: get_errors(&snapshot),
        error: get_error(&snapshot),
    })
}

// =============================================================================
// SELECT HANDLER
// =============================================================================

/// Resolve and evaluate a selector.
pub async fn select_handler(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    Json(request): Json<ArgsRequest>,
) -> Result<Json<SelectResponse>, ApiError> {
    let value = state
        .registry
        .resolve_select(&selector, &request.args)
        .await
        .map_err(|e| store_error(&e))?;
    Ok(Json(SelectResponse { selector, value }))
}

// =============================================================================
// ACTION HANDLER
// =============================================================================

/// Run a named action creator.
///
/// Request failures inside a fetch come back as a `200` with the error in
/// `result.error`; they are recorded in the store, not raised.
pub async fn action_handler(
    State(state): State<AppState>,
    Path(action): Path<String>,
    Json(request): Json<ArgsRequest>,
) -> Result<Json<ActionResponse>, ApiError> {
    let result = state
        .registry
        .dispatch_action(&action, &request.args)
        .await
        .map_err(|e| store_error(&e))?;
    Ok(Json(ActionResponse { action, result }))
}

// =============================================================================
// INVALIDATE HANDLER
// =============================================================================

/// Let a selector's resolver run again.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(selector): Path<String>,
    Json(request): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>, ApiError> {
    if !state.registry.fragment().selectors.contains_key(&selector) {
        return Err(store_error(&StoreError::UnknownSelector(selector)));
    }

    let keyed = match request.args {
        Some(args) => {
            state.registry.invalidate_resolution(&selector, &args);
            true
        }
        None => {
            state.registry.invalidate_resolution_for_selector(&selector);
            false
        }
    };
    tracing::debug!(selector = %selector, keyed, "resolution invalidated");
    Ok(Json(InvalidateResponse { selector, keyed }))
}
