//! # Application Errors
//!
//! Everything the binary can fail with. Store and request failures keep
//! their own types from `storekit-core`.

use storekit_core::{ServiceError, StoreError};
use thiserror::Error;

/// Errors raised by the storekit application.
#[derive(Debug, Error)]
pub enum AppError {
    /// The configuration is missing, malformed or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A request reached the API and failed.
    #[error("Request failed: {0}")]
    Request(ServiceError),

    /// Unknown datapoint name.
    #[error("Unknown datapoint: {0}")]
    UnknownDatapoint(String),

    /// JSON input or output failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP server could not start or stopped with an error.
    #[error("Server error: {0}")]
    Server(String),
}
