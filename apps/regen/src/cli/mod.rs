//! # Regen CLI Module
//!
//! ## Available Commands
//!
//! - `plan` - Run the pipeline and write the generation plan
//! - `status` - Show enablement counts after the selection
//! - `check` - Run the pipeline and fail on dependency cycles
//! - `inspect` - Show the variants of one operation
//! - `verify` - Validate a binary plan and print its checksum

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use regen_core::RegenError;
use std::path::PathBuf;
use std::process::ExitCode;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// regen - curated API binding planner
///
/// Reads a tokenized API registry, applies the configured selection and
/// produces a dependency-ordered generation plan.
#[derive(Parser, Debug)]
#[command(name = "regen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file [default: regen.toml if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the registry JSON (overrides the config)
    #[arg(short, long, global = true)]
    pub registry: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the whole pipeline and write the plan
    Plan {
        /// Output file (stdout if omitted; JSON only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value_t = PlanFormat::Json)]
        format: PlanFormat,
    },

    /// Show per-category enablement counts
    Status,

    /// Run the pipeline; exit non-zero if a dependency cycle was found
    Check,

    /// Print the variants of one operation
    Inspect {
        /// Operation name, either spelling
        operation: String,

        /// Context to resolve in
        #[arg(long, default_value = "plain")]
        context: String,
    },

    /// Validate a binary plan file
    Verify {
        file: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Json,
    Binary,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<ExitCode, RegenError> {
    let config = cli.config.as_deref();
    let registry = cli.registry.as_deref();
    let settings = || Settings::resolve(config, registry);

    match cli.command {
        Commands::Plan { output, format } => {
            cmd_plan(&settings()?, output.as_deref(), format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            cmd_status(&settings()?, cli.json_mode)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check => cmd_check(&settings()?, cli.json_mode).map(exit_code),
        Commands::Inspect { operation, context } => {
            cmd_inspect(&settings()?, &operation, &context).map(exit_code)
        }
        Commands::Verify { file } => {
            cmd_verify(&file, cli.json_mode)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(passed: bool) -> ExitCode {
    if passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
