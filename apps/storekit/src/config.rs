//! # Configuration
//!
//! Loads `storekit.toml` and applies environment overrides.
//!
//! ```toml
//! api_url = "http://localhost:8080/wp-json"
//! namespace = "google-site-kit/v1"
//!
//! [server]
//! host = "127.0.0.1"
//! port = 8090
//! rate_limit = 100
//!
//! [[datapoints]]
//! name = "report"
//! module = "analytics"
//! endpoint = "report"
//! method = "GET"
//! params = ["slug"]
//! required = ["slug"]
//! ```
//!
//! ## Environment Variables
//!
//! - `STOREKIT_API_URL`: overrides `api_url`
//! - `STOREKIT_RATE_LIMIT`: overrides `server.rate_limit` (0 disables)

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "storekit.toml";

/// Slices owned by the error sub-store; datapoints may not shadow them.
const RESERVED_SLICES: [&str; 3] = ["errors", "errorArgs", "error"];

// =============================================================================
// TYPES
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the REST API, without trailing slash.
    pub api_url: String,
    /// Route namespace prepended to every datapoint path.
    pub namespace: String,
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Datapoints exposed through the dashboard store.
    pub datapoints: Vec<DatapointConfig>,
}

/// `[server]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second; 0 disables rate limiting.
    pub rate_limit: u32,
}

/// One `[[datapoints]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatapointConfig {
    /// Datapoint name; also the name of its cache slice.
    pub name: String,
    pub module: String,
    pub endpoint: String,
    #[serde(default)]
    pub method: HttpMethod,
    /// Positional argument names, in call order.
    #[serde(default)]
    pub params: Vec<String>,
    /// Params that must be present and non-empty.
    #[serde(default)]
    pub required: Vec<String>,
}

/// Request method of a datapoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/wp-json".to_string(),
            namespace: "google-site-kit/v1".to_string(),
            server: ServerConfig::default(),
            datapoints: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            rate_limit: 100,
        }
    }
}

// =============================================================================
// LOADING
// =============================================================================

impl AppConfig {
    /// Parse and validate a configuration document.
    pub fn from_toml_str(source: &str) -> Result<Self, AppError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `storekit.toml` in the
    /// working directory is used if present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("no {} found, using defaults", DEFAULT_CONFIG_FILE);
                return Ok(Self::default());
            }
        };

        let source = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(
            path = %path.display(),
            datapoints = config.datapoints.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Apply `STOREKIT_API_URL` and `STOREKIT_RATE_LIMIT`.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        let api_url = std::env::var("STOREKIT_API_URL").ok().filter(|v| !v.is_empty());
        let rate_limit = std::env::var("STOREKIT_RATE_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok());
        self.with_overrides(api_url, rate_limit)
    }

    /// Apply explicit overrides; `None` keeps the current value.
    #[must_use]
    pub fn with_overrides(mut self, api_url: Option<String>, rate_limit: Option<u32>) -> Self {
        if let Some(url) = api_url {
            self.api_url = url;
        }
        if let Some(limit) = rate_limit {
            self.server.rate_limit = limit;
        }
        self
    }

    /// Look up a datapoint by name.
    #[must_use]
    pub fn datapoint(&self, name: &str) -> Option<&DatapointConfig> {
        self.datapoints.iter().find(|d| d.name == name)
    }

    /// Check datapoint names and parameter lists.
    pub fn validate(&self) -> Result<(), AppError> {
        let mut seen = BTreeSet::new();
        for datapoint in &self.datapoints {
            let name = datapoint.name.as_str();
            if name.is_empty() {
                return Err(AppError::Config("datapoint with empty name".into()));
            }
            if RESERVED_SLICES.contains(&name) {
                return Err(AppError::Config(format!(
                    "datapoint name '{name}' is reserved"
                )));
            }
            if !seen.insert(name) {
                return Err(AppError::Config(format!("duplicate datapoint '{name}'")));
            }
            if datapoint.module.is_empty() || datapoint.endpoint.is_empty() {
                return Err(AppError::Config(format!(
                    "datapoint '{name}' needs a module and an endpoint"
                )));
            }
            if let Some(missing) = datapoint
                .required
                .iter()
                .find(|r| !datapoint.params.contains(r))
            {
                return Err(AppError::Config(format!(
                    "datapoint '{name}' requires '{missing}' which is not in its params"
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
api_url = "https://example.test/wp-json"

[server]
port = 9000

[[datapoints]]
name = "report"
module = "analytics"
endpoint = "report"
params = ["slug", "dateRange"]
required = ["slug"]

[[datapoints]]
name = "settings"
module = "search-console"
endpoint = "settings"
method = "POST"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = AppConfig::from_toml_str(SAMPLE).expect("parse");
        assert_eq!(config.api_url, "https://example.test/wp-json");
        assert_eq!(config.namespace, "google-site-kit/v1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.rate_limit, 100);

        let report = config.datapoint("report").expect("report");
        assert_eq!(report.method, HttpMethod::Get);
        assert_eq!(report.params, vec!["slug", "dateRange"]);

        let settings = config.datapoint("settings").expect("settings");
        assert_eq!(settings.method, HttpMethod::Post);
        assert!(settings.params.is_empty());
    }

    #[test]
    fn rejects_required_outside_params() {
        let source = r#"
[[datapoints]]
name = "report"
module = "analytics"
endpoint = "report"
required = ["slug"]
"#;
        assert!(matches!(AppConfig::from_toml_str(source), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_duplicate_and_reserved_names() {
        let twice = r#"
[[datapoints]]
name = "report"
module = "a"
endpoint = "b"

[[datapoints]]
name = "report"
module = "a"
endpoint = "c"
"#;
        assert!(matches!(AppConfig::from_toml_str(twice), Err(AppError::Config(_))));

        let reserved = r#"
[[datapoints]]
name = "errors"
module = "a"
endpoint = "b"
"#;
        assert!(matches!(AppConfig::from_toml_str(reserved), Err(AppError::Config(_))));
    }

    #[test]
    fn malformed_toml_is_reported() {
        assert!(matches!(AppConfig::from_toml_str("api_url = "), Err(AppError::Toml(_))));
    }

    #[test]
    fn overrides_replace_only_given_values() {
        let config = AppConfig::default().with_overrides(Some("http://other".into()), None);
        assert_eq!(config.api_url, "http://other");
        assert_eq!(config.server.rate_limit, 100);

        let config = config.with_overrides(None, Some(0));
        assert_eq!(config.api_url, "http://other");
        assert_eq!(config.server.rate_limit, 0);
    }
}
