//! Adapter abstraction traits
//!
//! The export pipeline only talks to its backends through these traits, so the
//! orchestrator can be driven by in-memory implementations in tests.

use crate::domain::{RawRecord, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use std::time::Duration;

/// Lazy, single-pass sequence of records produced by a [`RecordSource`]
///
/// Each item is either a record or the error that ended the scan. The stream
/// is finite and cannot be restarted; open a new cursor instead.
pub type RecordStream = BoxStream<'static, Result<RawRecord>>;

/// Document store holding the attribute records
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Check that the store is reachable
    ///
    /// A source that answers `Ok` is reachable and authenticated.
    ///
    /// # Errors
    ///
    /// Returns a connection-class error if the store cannot be reached.
    async fn ping(&self) -> Result<()>;

    /// Open a cursor over the collection
    ///
    /// With a `cutoff`, only records whose `updated` is strictly after it are
    /// produced. Without one, every record is produced. `page_size` is the
    /// number of documents the server returns per round trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the query is rejected. Errors while advancing the
    /// cursor are yielded as items of the stream instead.
    async fn open_cursor(
        &self,
        cutoff: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<RecordStream>;

    /// Name of the collection being scanned
    fn collection_name(&self) -> &str;
}

/// Keyed message sink
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Enqueue one message
    ///
    /// This only hands the message to the client's local queue. Delivery
    /// failures are reported later through [`Publisher::delivery_failures`].
    ///
    /// # Errors
    ///
    /// Returns an error if the local queue rejects the message.
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<()>;

    /// Wait until every enqueued message is acknowledged or `timeout` elapses
    ///
    /// # Errors
    ///
    /// Returns an error if the deadline passes with messages still in flight.
    async fn flush(&self, timeout: Duration) -> Result<()>;

    /// Number of messages the broker reported as undeliverable so far
    fn delivery_failures(&self) -> u64 {
        0
    }
}

/// Storage for the last-run checkpoint
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Read the stored checkpoint
    ///
    /// Returns `Ok(None)` when nothing has been written yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored payload cannot be read or parsed.
    async fn read(&self) -> Result<Option<DateTime<Utc>>>;

    /// Replace the stored checkpoint
    ///
    /// # Errors
    ///
    /// Returns an error if the checkpoint cannot be persisted.
    async fn write(&self, timestamp: DateTime<Utc>) -> Result<()>;

    /// Human-readable location of the checkpoint, for logs
    fn location(&self) -> String;
}
