//! Error context extension trait
//!
//! `anyhow::Context` for library code: adds a message in front of an error while
//! keeping the [`ExportError`] type, so callers can still match on it.
//!
//! # Examples
//!
//! ```rust
//! use afid_export::domain::{ExportError, Result};
//! use afid_export::domain::context::ResultExt;
//!
//! fn read_checkpoint(path: &str) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .context(format!("Failed to read checkpoint file: {}", path))
//! }
//! ```

use crate::domain::errors::ExportError;
use crate::domain::result::Result;

/// Extension trait for adding context to `Result` types
pub trait ResultExt<T> {
    /// Add context to an error
    ///
    /// The context is evaluated eagerly. Use `.with_context()` when building
    /// it is not free.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;

    /// Add context to an error, computing it only on failure
    ///
    /// # Examples
    ///
    /// ```rust
    /// use afid_export::domain::Result;
    /// use afid_export::domain::context::ResultExt;
    ///
    /// fn open(collection: &str) -> Result<()> {
    ///     connect().with_context(|| format!("Opening collection {}", collection))
    /// }
    /// # fn connect() -> Result<()> { Ok(()) }
    /// ```
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<ExportError>,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| wrap(e.into(), context))
    }

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

/// Prefix the message while keeping the variant where the message is owned
///
/// Variants that carry a structured source error (`Source`, `Broker`,
/// `Validation`) collapse to `Other`, since their payload cannot hold a prefix.
fn wrap<C: std::fmt::Display>(err: ExportError, context: C) -> ExportError {
    match err {
        ExportError::Configuration(msg) => {
            ExportError::Configuration(format!("{context}: {msg}"))
        }
        ExportError::Connection(msg) => ExportError::Connection(format!("{context}: {msg}")),
        ExportError::State(msg) => ExportError::State(format!("{context}: {msg}")),
        ExportError::Io(msg) => ExportError::Io(format!("{context}: {msg}")),
        ExportError::Serialization(msg) => {
            ExportError::Serialization(format!("{context}: {msg}"))
        }
        other => ExportError::Other(format!("{context}: {other}")),
    }
}
