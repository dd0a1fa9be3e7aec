//! Export orchestration
//!
//! This module provides the core export logic, including:
//! - Run coordination and its phase machine
//! - Flush cadence tracking
//! - Summary and reporting

pub mod batch;
pub mod coordinator;
pub mod summary;

pub use batch::{BatchTracker, PROGRESS_LOG_INTERVAL};
pub use coordinator::{ExportCoordinator, RunPhase};
pub use summary::ExportSummary;
