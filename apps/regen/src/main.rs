//! # regen
//!
//! Command line planner for curated API bindings.
//!
//! ## Usage
//!
//! ```bash
//! # Write the plan for the selection in regen.toml
//! regen --registry vk.json plan -o plan.bin --format binary
//!
//! # Enablement counts
//! regen status
//!
//! # One operation in one context
//! regen inspect vkCreateBuffer --context raii
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the filter and
//! `REGEN_LOG_FORMAT=json` switches to JSON lines.

use clap::Parser;
use regen::cli;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let log_format = std::env::var("REGEN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "regen=info,regen_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
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

    match cli::execute(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
