//! CLI interface and argument parsing
//!
//! `afid-export [CONFIG] [--log-level L] [COMMAND]`. Without a command the
//! export runs with the loaded configuration as-is.

pub mod commands;

use clap::{Parser, Subcommand};

/// afid-export - incremental MongoDB to Kafka attribute export
#[derive(Parser, Debug)]
#[command(name = "afid-export")]
#[command(version, about, long_about = None)]
#[command(subcommand_precedence_over_arg = true)]
pub struct Cli {
    /// Path to a JSON or TOML configuration file; environment variables are
    /// used when omitted
    #[arg(value_name = "CONFIG", env = "AFID_EXPORT_CONFIG")]
    pub config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run an export, optionally overriding run settings
    Export(commands::export::ExportArgs),

    /// Validate the configuration and print a redacted summary
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the last checkpoint and the window the next run would use
    Status(commands::status::StatusArgs),
}
