//! Result type alias for the exporter

use super::errors::ExportError;

/// Result type alias for export operations
///
/// # Examples
///
/// ```
/// use afid_export::domain::result::Result;
/// use afid_export::domain::errors::ExportError;
///
/// fn failing_function() -> Result<()> {
///     Err(ExportError::Configuration("KAFKA_TOPIC is required".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, ExportError>;
