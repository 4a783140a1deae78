//! # storekit
//!
//! Library half of the storekit binary: configuration, the REST transport,
//! the dashboard store, the HTTP API and the CLI. Integration tests reach
//! everything through `storekit::*`.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod dashboard;
pub mod error;

pub use client::{ApiRequest, RestClient, SharedTransport, Transport};
pub use config::{AppConfig, DatapointConfig, HttpMethod, ServerConfig};
pub use dashboard::{Dashboard, Datapoint};
pub use error::AppError;
