//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api::{self, AppState, DatapointInfo};
use crate::client::RestClient;
use crate::config::AppConfig;
use crate::dashboard::Dashboard;
use crate::error::AppError;
use serde_json::{Value, json};
use std::sync::Arc;
use storekit_core::{FetchNames, stringify_value};

/// Build the dashboard store against the configured REST API.
fn build_dashboard(config: &AppConfig) -> Result<Dashboard, AppError> {
    let client = RestClient::new(config.api_url.as_str(), config.namespace.as_str());
    Ok(Dashboard::build(config, Arc::new(client))?)
}

/// Parse positional arguments: valid JSON is taken as JSON, anything else
/// as a plain string.
pub fn parse_args(args: &[String]) -> Vec<Value> {
    args.iter()
        .map(|arg| serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.clone())))
        .collect()
}

fn print_json(value: &Value) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(
    config: AppConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), AppError> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let dashboard = build_dashboard(&config)?;

    println!("storekit server starting...");
    println!();
    println!("Configuration:");
    println!("  Host:       {}", host);
    println!("  Port:       {}", port);
    println!("  API:        {}/{}", config.api_url, config.namespace);
    println!("  Datapoints: {}", dashboard.datapoints().len());
    println!();
    println!("Endpoints:");
    println!("  GET  /health                - Health check");
    println!("  GET  /state                 - Current state");
    println!("  GET  /datapoints            - Configured datapoints");
    println!("  GET  /errors                - Recorded errors");
    println!("  POST /select/{{selector}}     - Resolving select");
    println!("  POST /actions/{{action}}      - Run an action");
    println!("  POST /invalidate/{{selector}} - Invalidate resolution");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(dashboard, config.server.rate_limit);
    api::run_server(&format!("{}:{}", host, port), state).await
}

// =============================================================================
// FETCH COMMAND
// =============================================================================

/// Fetch one datapoint and print the response.
pub async fn cmd_fetch(
    config: &AppConfig,
    name: &str,
    args: &[String],
    json_mode: bool,
) -> Result<(), AppError> {
    let dashboard = build_dashboard(config)?;
    let datapoint = dashboard
        .datapoint(name)
        .ok_or_else(|| AppError::UnknownDatapoint(name.to_string()))?;
    let args = parse_args(args);
    let registry = dashboard.registry();

    let result = datapoint.store.run(&registry, &args).await?;

    if json_mode {
        print_json(&result.to_value())?;
    } else if let Some(response) = &result.response {
        print_json(response)?;
    }

    match result.error {
        None => Ok(()),
        Some(error) => Err(AppError::Request(error)),
    }
}

// =============================================================================
// SELECT COMMAND
// =============================================================================

/// Resolve a selector and print its value.
pub async fn cmd_select(
    config: &AppConfig,
    selector: &str,
    args: &[String],
    json_mode: bool,
) -> Result<(), AppError> {
    let dashboard = build_dashboard(config)?;
    let registry = dashboard.registry();
    let args = parse_args(args);

    let value = registry.resolve_select(selector, &args).await?;

    if json_mode {
        print_json(&json!({ "selector": selector, "args": args, "value": value }))
    } else {
        print_json(&value)
    }
}

// =============================================================================
// DATAPOINTS COMMAND
// =============================================================================

/// List configured datapoints.
pub fn cmd_datapoints(config: &AppConfig, json_mode: bool) -> Result<(), AppError> {
    let dashboard = build_dashboard(config)?;
    let infos: Vec<DatapointInfo> = dashboard.datapoints().iter().map(DatapointInfo::from).collect();

    if json_mode {
        return print_json(&serde_json::to_value(&infos)?);
    }

    if infos.is_empty() {
        println!("No datapoints configured.");
        return Ok(());
    }

    println!("Datapoints ({})", infos.len());
    println!("==============");
    for info in &infos {
        println!();
        println!("{}", info.name);
        println!("  Route:    {} {}/{}", info.method, info.module, info.endpoint);
        println!("  Selector: {}", info.selector);
        println!("  Fetch:    {}", info.fetch_action);
        if !info.params.is_empty() {
            println!("  Params:   {}", info.params.join(", "));
        }
        if !info.required.is_empty() {
            println!("  Required: {}", info.required.join(", "));
        }
    }
    Ok(())
}

// =============================================================================
// KEY COMMAND
// =============================================================================

/// Print the cache key of a JSON value.
pub fn cmd_key(input: &str, json_mode: bool) -> Result<(), AppError> {
    let value: Value = serde_json::from_str(input)?;
    let key = stringify_value(&value);

    if json_mode {
        print_json(&json!({ "key": key }))
    } else {
        println!("{}", key);
        Ok(())
    }
}

// =============================================================================
// NAMES COMMAND
// =============================================================================

/// Print the identifiers generated for a base name.
pub fn cmd_names(base_name: &str, json_mode: bool) -> Result<(), AppError> {
    let names = FetchNames::new(base_name)?;
    let [start, fetch, receive, finish, catch] = names.action_types();

    if json_mode {
        return print_json(&json!({
            "base_name": names.base_name,
            "fetch_action": names.fetch_action,
            "receive_action": names.receive_action,
            "is_fetching_selector": names.is_fetching_selector,
            "action_types": [start, fetch, receive, finish, catch],
        }));
    }

    println!("Base name:          {}", names.base_name);
    println!("Fetch action:       {}", names.fetch_action);
    println!("Receive action:     {}", names.receive_action);
    println!("In-flight selector: {}", names.is_fetching_selector);
    println!("Action types:");
    for kind in [start, fetch, receive, finish, catch] {
        println!("  {}", kind);
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
