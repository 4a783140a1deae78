//! # storekit
//!
//! Serves and queries dashboard data through composable fetch stores.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/storekit (THE BINARY)                 │
//! │                                                              │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────────┐   │
//! │  │   CLI       │    │   HTTP API  │    │  REST transport │   │
//! │  │  (clap)     │    │   (axum)    │    │    (reqwest)    │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬────────┘   │
//! │         └──────────────────┼────────────────────┘            │
//! │                            ▼                                 │
//! │                   ┌─────────────────┐                        │
//! │                   │  storekit-core  │                        │
//! │                   │   (THE LOGIC)   │                        │
//! │                   └─────────────────┘                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! storekit serve --port 8090
//! storekit fetch report home
//! storekit select getReport home
//! storekit key '{"b":1,"a":2}'
//! ```

use clap::Parser;
use storekit::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // STOREKIT_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("STOREKIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storekit=info,storekit_core=info,tower_http=debug".into());

    // Logs go to stderr so command output on stdout stays parseable.
    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the startup banner.
fn print_banner() {
    eprintln!(
        r#"
  storekit v{}
  composable stores for server-backed data
"#,
        env!("CARGO_PKG_VERSION")
    );
}
