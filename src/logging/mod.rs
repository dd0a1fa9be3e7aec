//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Human-readable console output
//! - JSON log files with daily/hourly rotation
//! - `RUST_LOG` style filtering
//!
//! # Example
//!
//! ```no_run
//! use afid_export::logging::init_logging;
//! use afid_export::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(collection = "afids", "Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, parse_log_level, LoggingGuard};

/// Log progress of a running export
///
/// # Example
///
/// ```no_run
/// use afid_export::log_batch_progress;
///
/// // flushes, records read, records published
/// log_batch_progress!(10, 5000, 4990);
/// ```
#[macro_export]
macro_rules! log_batch_progress {
    ($flushes:expr, $read:expr, $published:expr) => {
        tracing::info!(
            flushes = $flushes,
            records_read = $read,
            records_published = $published,
            "Export progress"
        );
    };
}

/// Log the outcome of an export run
///
/// # Example
///
/// ```no_run
/// use afid_export::log_run_complete;
/// use std::time::Duration;
///
/// log_run_complete!(4990, Duration::from_secs(12));
/// ```
#[macro_export]
macro_rules! log_run_complete {
    ($published:expr, $duration:expr) => {
        tracing::info!(
            records_published = $published,
            duration_ms = $duration.as_millis() as u64,
            "Export run finished"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use afid_export::log_error_with_context;
/// use afid_export::domain::ExportError;
///
/// let error = ExportError::Configuration("BATCH_SIZE is required".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::ExportError;
    use std::time::Duration;

    #[test]
    fn test_macros_expand_without_subscriber() {
        let error = ExportError::Other("boom".to_string());
        crate::log_batch_progress!(10_u64, 20_u64, 18_u64);
        crate::log_run_complete!(18_u64, Duration::from_millis(1500));
        crate::log_error_with_context!(&error, "while testing");
    }
}
