//! Domain models and types for the exporter.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifier** ([`Afid`])
//! - **Record models** ([`RawRecord`], [`AfidAttributes`])
//! - **Error types** ([`ExportError`], [`SourceError`], [`BrokerError`], [`ValidationError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ExportError>`]:
//!
//! ```rust
//! use afid_export::domain::{Afid, Result};
//!
//! fn example() -> Result<Afid> {
//!     // ValidationError converts into ExportError through `?`
//!     let afid = Afid::new(1001)?;
//!     Ok(afid)
//! }
//! ```

pub mod context;
pub mod errors;
pub mod ids;
pub mod record;
pub mod result;

// Re-export commonly used types for convenience
pub use context::ResultExt;
pub use errors::{BrokerError, ExportError, SourceError, ValidationError};
pub use ids::Afid;
pub use record::{AfidAttributes, RawRecord};
pub use result::Result;
