//! Export command implementation
//!
//! Runs one export. Also used when no subcommand is given, with default
//! arguments.

use crate::config::{resolve_config, AppConfig};
use crate::core::export::{ExportCoordinator, ExportSummary};
use crate::domain::ExportError;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug, Default)]
pub struct ExportArgs {
    /// Ignore the checkpoint and export the whole collection
    #[arg(long)]
    pub initial_run: bool,

    /// Override the lookback window used when no checkpoint exists
    #[arg(long, value_name = "HOURS")]
    pub lookback_hours: Option<u32>,

    /// Read and validate records without publishing or checkpointing
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if self.initial_run {
            tracing::info!("Initial run requested from CLI");
            config.export.initial_run = true;
        }

        if let Some(hours) = self.lookback_hours {
            tracing::info!(lookback_hours = hours, "Overriding lookback window from CLI");
            config.export.lookback_hours = hours;
        }

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }
    }

    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: Option<&str>,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match resolve_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        self.apply_overrides(&mut config);

        if let Err(e) = config.validate() {
            tracing::error!(error = %e, "Configuration validation failed");
            eprintln!("Configuration validation failed: {e}");
            return Ok(2); // Configuration error exit code
        }

        if config.export.dry_run {
            println!("🔍 DRY RUN MODE - nothing will be sent to Kafka");
            println!();
        }

        let coordinator = match ExportCoordinator::new(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                crate::log_error_with_context!(&e, "Failed to create export coordinator");
                eprintln!("Failed to initialize export: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let summary = match coordinator.execute_export().await {
            Ok(s) => s,
            Err(e) => {
                crate::log_error_with_context!(&e, "Export failed");
                eprintln!("Export failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        print_summary(&summary);

        let exit_code = if summary.interrupted {
            println!("⚠️  Export interrupted. Checkpoint not updated; the next run repeats this window.");
            130 // SIGINT exit code (standard Unix convention)
        } else {
            println!("✅ Export completed!");
            0
        };

        Ok(exit_code)
    }
}

/// Map a run error onto the process exit code
pub fn exit_code_for(error: &ExportError) -> i32 {
    if error.is_connection() {
        4 // Connection error exit code
    } else if matches!(error, ExportError::Configuration(_)) {
        2 // Configuration error exit code
    } else if matches!(error, ExportError::Cancelled(_)) {
        130
    } else {
        5 // Fatal error exit code
    }
}

fn print_summary(summary: &ExportSummary) {
    println!();
    println!("📊 Export Summary:");
    println!("  Window: {}", summary.cutoff);
    println!("  Records Read: {}", summary.records_read);
    println!("  Published: {}", summary.records_published);
    println!("  Skipped (invalid): {}", summary.records_skipped);
    println!("  Publish Failures: {}", summary.publish_failures);
    println!("  Delivery Failures: {}", summary.delivery_failures);
    println!("  Flushes: {}", summary.flushes);
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!("  Throughput: {:.1} records/s", summary.throughput());
    match summary.checkpoint {
        Some(ts) => println!("  Checkpoint: {}", ts.to_rfc3339()),
        None => println!("  Checkpoint: not updated"),
    }
    println!();
}
