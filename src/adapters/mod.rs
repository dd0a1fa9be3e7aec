//! External system integrations for the exporter.
//!
//! - [`mongodb`] - Record source reading the attribute collection
//! - [`kafka`] - Keyed publisher, plus a dry-run stand-in
//! - [`checkpoint`] - Last-run checkpoint storage
//! - [`memory`] - In-memory source and publisher for tests
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies.
//! The orchestrator only sees the traits in [`traits`], so every backend can be
//! swapped for an in-memory one.
//!
//! ```rust,no_run
//! use afid_export::adapters::factory::{create_publisher, create_record_source};
//! use afid_export::config::resolve_config;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = resolve_config(None)?;
//! let source = create_record_source(&config).await?;
//! let publisher = create_publisher(&config)?;
//! # Ok(())
//! # }
//! ```

pub mod checkpoint;
pub mod factory;
pub mod kafka;
pub mod memory;
pub mod mongodb;
pub mod traits;

pub use traits::{CheckpointStorage, Publisher, RecordSource, RecordStream};
