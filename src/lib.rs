// afid-export - Incremental MongoDB to Kafka attribute export
// Copyright (c) 2025 afid-export Contributors
// Licensed under the MIT License

//! # afid-export
//!
//! afid-export streams affiliate attribute records ("afids") that changed
//! since the previous run out of a MongoDB collection and publishes them to a
//! Kafka topic, keyed by afid. A small JSON checkpoint remembers when the
//! last complete run finished.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (export run, transform, checkpoint state)
//! - [`adapters`] - External integrations (MongoDB, Kafka, checkpoint file)
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration from a file or the environment
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use afid_export::config::resolve_config;
//! use afid_export::core::export::ExportCoordinator;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = resolve_config(Some("afid-export.json"))?;
//!
//!     let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!     let coordinator = ExportCoordinator::new(config, shutdown_rx).await?;
//!
//!     let summary = coordinator.execute_export().await?;
//!     println!("Published {} records", summary.records_published);
//!     Ok(())
//! }
//! ```
//!
//! ## Time Window
//!
//! Each run publishes records whose `updated` timestamp is strictly after a
//! cutoff:
//!
//! - **Initial run**: no cutoff, the whole collection is exported
//! - **Checkpoint**: the completion time of the last successful run
//! - **Lookback**: `now - lookback_hours` when no checkpoint is readable
//!
//! ```rust
//! use afid_export::core::state::Cutoff;
//! use chrono::{Duration, Utc};
//!
//! let now = Utc::now();
//! let cutoff = Cutoff::resolve(false, None, Duration::hours(24), now);
//! assert_eq!(cutoff.kind(), "lookback");
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`], an alias over
//! [`domain::ExportError`]. Records that fail validation are skipped and
//! counted rather than aborting the run.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
