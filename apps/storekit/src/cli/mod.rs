//! # storekit CLI Module
//!
//! ## Available Commands
//!
//! - `serve` - Start the HTTP server
//! - `fetch` - Fetch one datapoint and print the result
//! - `select` - Resolve a selector and print its value
//! - `datapoints` - List configured datapoints (default)
//! - `key` - Print the cache key of a JSON value
//! - `names` - Print the identifiers generated for a base name

mod commands;

use crate::config::AppConfig;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// storekit - composable stores for server-backed dashboard data
#[derive(Parser, Debug)]
#[command(name = "storekit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to the configuration file (default: ./storekit.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the REST API root
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Serve {
        /// Host to bind to (default: server.host)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (default: server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch a datapoint
    Fetch {
        /// Datapoint name
        datapoint: String,

        /// Positional arguments (JSON, or plain strings)
        args: Vec<String>,
    },

    /// Resolve a selector and print its value
    Select {
        /// Selector name, e.g. getReport
        selector: String,

        /// Positional arguments (JSON, or plain strings)
        args: Vec<String>,
    },

    /// List configured datapoints
    Datapoints,

    /// Print the cache key of a JSON value
    Key {
        /// JSON value, e.g. '{"b":1,"a":2}'
        json: String,
    },

    /// Print the identifiers generated for a base name
    Names {
        /// Base name, e.g. getReport
        base_name: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let json_mode = cli.json_mode;
    let (config_path, api_url) = (cli.config, cli.api_url);
    let load_config = move || -> Result<AppConfig, AppError> {
        Ok(AppConfig::load(config_path.as_deref())?
            .with_env_overrides()
            .with_overrides(api_url, None))
    };

    match cli.command {
        Some(Commands::Serve { host, port }) => cmd_serve(load_config()?, host, port).await,
        Some(Commands::Fetch { datapoint, args }) => {
            cmd_fetch(&load_config()?, &datapoint, &args, json_mode).await
        }
        Some(Commands::Select { selector, args }) => {
            cmd_select(&load_config()?, &selector, &args, json_mode).await
        }
        Some(Commands::Key { json }) => cmd_key(&json, json_mode),
        Some(Commands::Names { base_name }) => cmd_names(&base_name, json_mode),
        Some(Commands::Datapoints) | None => cmd_datapoints(&load_config()?, json_mode),
    }
}
