//! # storekit HTTP API Module
//!
//! This module exposes the dashboard store over HTTP using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /state` - Current published state
//! - `GET /datapoints` - Configured datapoints and generated names
//! - `GET /errors` - Recorded request failures
//! - `POST /select/{selector}` - Resolving select, body `{"args": [...]}`
//! - `POST /actions/{action}` - Run an action creator, body `{"args": [...]}`
//! - `POST /invalidate/{selector}` - Let a resolver run again
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `STOREKIT_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `STOREKIT_RATE_LIMIT`: Requests per second (overrides `server.rate_limit`, 0 to disable)
//! - `STOREKIT_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::get_api_key_from_env;
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{
    ActionResponse, ArgsRequest, DatapointInfo, ErrorResponse, ErrorsResponse, HealthResponse,
    InvalidateRequest, InvalidateResponse, SelectResponse,
};

use crate::dashboard::Dashboard;
use crate::error::AppError;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use storekit_core::Registry;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the dashboard definition and its running store.
#[derive(Clone)]
pub struct AppState {
    pub dashboard: Arc<Dashboard>,
    pub registry: Registry,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
}

impl AppState {
    /// Start a registry for `dashboard`.
    #[must_use]
    pub fn new(dashboard: Dashboard, rate_limit: u32) -> Self {
        let registry = dashboard.registry();
        Self {
            dashboard: Arc::new(dashboard),
            registry,
            rate_limit,
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from `STOREKIT_CORS_ORIGINS`.
///
/// `*` allows every origin, a comma-separated list allows those origins,
/// and an unset variable allows localhost only.
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("STOREKIT_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            tracing::warn!(
                "CORS: Allowing ALL origins (STOREKIT_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in STOREKIT_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                restricted_cors(allowed_origins)
            }
        }
        None => {
            tracing::info!("CORS: No STOREKIT_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        "http://localhost:3000",
        "http://localhost:8090",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8090",
    ]
    .into_iter()
    .filter_map(|origin| origin.parse::<HeaderValue>().ok())
    .collect();

    restricted_cors(origins)
}

fn restricted_cors(origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - global quota (if enabled)
/// 4. Authentication - validates API key (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limiter = if state.rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", state.rate_limit);
        Some(create_rate_limiter(state.rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set STOREKIT_API_KEY environment variable to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/state", get(handlers::state_handler))
        .route("/datapoints", get(handlers::datapoints_handler))
        .route("/errors", get(handlers::errors_handler))
        .route("/select/{selector}", post(handlers::select_handler))
        .route("/actions/{action}", post(handlers::action_handler))
        .route("/invalidate/{selector}", post(handlers::invalidate_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer()),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server and serve until the process is stopped.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), AppError> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("Bind failed: {}", e)))?;

    tracing::info!("storekit HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| AppError::Server(format!("Server error: {}", e)))
}
