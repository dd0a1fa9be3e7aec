//! Core business logic for the exporter.
//!
//! # Modules
//!
//! - [`export`] - Run orchestration, flush cadence and summary
//! - [`state`] - Checkpoint handling and time window selection
//! - [`transform`] - Raw record to normalized attributes
//!
//! # Export Workflow
//!
//! 1. **Load State**: Read the last-run checkpoint
//! 2. **Pick Window**: Full scan, since the checkpoint, or the lookback window
//! 3. **Scan**: Stream matching records from MongoDB
//! 4. **Transform**: Validate and project each record, skipping bad ones
//! 5. **Publish**: Send keyed messages to Kafka, flushing every batch
//! 6. **Checkpoint**: Record the completion time after a full pass
//!
//! # Example
//!
//! ```rust,no_run
//! use afid_export::config::resolve_config;
//! use afid_export::core::export::ExportCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = resolve_config(None)?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//!
//! let summary = coordinator.execute_export().await?;
//! println!("Published: {}", summary.records_published);
//! println!("Skipped: {}", summary.records_skipped);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod state;
pub mod transform;
