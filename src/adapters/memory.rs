//! In-memory source and publisher
//!
//! Drive the export pipeline without MongoDB or Kafka. The source applies the
//! same strict `updated > cutoff` rule as the MongoDB query; the publisher
//! records what it was given and can be told to fail.

use crate::adapters::traits::{Publisher, RecordSource, RecordStream};
use crate::domain::{BrokerError, ExportError, RawRecord, Result, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use mongodb::bson::Document;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Collection held in a `Vec`
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    collection: String,
    documents: Vec<Document>,
    fail_ping: AtomicBool,
    fail_open: AtomicBool,
    fail_after: Mutex<Option<usize>>,
    opened_with: Mutex<Vec<(Option<DateTime<Utc>>, usize)>>,
}

impl MemoryRecordSource {
    pub fn new(collection: impl Into<String>, documents: Vec<Document>) -> Self {
        Self {
            collection: collection.into(),
            documents,
            ..Self::default()
        }
    }

    /// Make `ping` fail
    pub fn fail_ping(&self, fail: bool) {
        self.fail_ping.store(fail, Ordering::SeqCst);
    }

    /// Make opening a cursor fail
    pub fn fail_open(&self, fail: bool) {
        self.fail_open.store(fail, Ordering::SeqCst);
    }

    /// End every cursor with an error after `count` records
    pub fn fail_after(&self, count: usize) {
        if let Ok(mut fail_after) = self.fail_after.lock() {
            *fail_after = Some(count);
        }
    }

    /// Cutoff and page size of every cursor opened so far
    pub fn opened_with(&self) -> Vec<(Option<DateTime<Utc>>, usize)> {
        self.opened_with
            .lock()
            .map(|opened| opened.clone())
            .unwrap_or_default()
    }

    fn matches(record: &RawRecord, cutoff: Option<DateTime<Utc>>) -> bool {
        match cutoff {
            None => true,
            Some(cutoff) => record.updated().map(|u| u > cutoff).unwrap_or(false),
        }
    }
}

#[async_trait]
impl RecordSource for MemoryRecordSource {
    async fn ping(&self) -> Result<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(SourceError::PingFailed("memory source unavailable".to_string()).into());
        }
        Ok(())
    }

    async fn open_cursor(
        &self,
        cutoff: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<RecordStream> {
        if let Ok(mut opened) = self.opened_with.lock() {
            opened.push((cutoff, page_size));
        }

        if self.fail_open.load(Ordering::SeqCst) {
            return Err(SourceError::CursorOpenFailed {
                collection: self.collection.clone(),
                message: "memory source rejected query".to_string(),
            }
            .into());
        }

        let mut items: Vec<Result<RawRecord>> = self
            .documents
            .iter()
            .cloned()
            .map(RawRecord::new)
            .filter(|record| Self::matches(record, cutoff))
            .map(Ok)
            .collect();

        let fail_after = self.fail_after.lock().ok().and_then(|f| *f);
        if let Some(count) = fail_after {
            items.truncate(count);
            items.push(Err(ExportError::from(SourceError::CursorAdvanceFailed(
                "connection reset".to_string(),
            ))));
        }

        Ok(stream::iter(items).boxed())
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }
}

/// A message handed to [`RecordingPublisher`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub key: String,
    pub value: String,
}

type PublishHook = Box<dyn Fn(&str) + Send + Sync>;

/// Publisher that keeps every message in memory
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<PublishedMessage>>,
    flushes: Mutex<Vec<usize>>,
    rejected_keys: Mutex<HashSet<String>>,
    fail_flush: AtomicBool,
    flush_delay: Mutex<Option<Duration>>,
    delivery_failures: AtomicU64,
    on_publish: Option<PublishHook>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` with the key of every accepted message
    pub fn with_publish_hook(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_publish = Some(Box::new(hook));
        self
    }

    /// Reject messages with this key at enqueue time
    pub fn reject_key(&self, key: impl Into<String>) {
        if let Ok(mut keys) = self.rejected_keys.lock() {
            keys.insert(key.into());
        }
    }

    /// Make every flush fail
    pub fn fail_flush(&self, fail: bool) {
        self.fail_flush.store(fail, Ordering::SeqCst);
    }

    /// Make every flush take `delay` before completing
    pub fn set_flush_delay(&self, delay: Duration) {
        if let Ok(mut flush_delay) = self.flush_delay.lock() {
            *flush_delay = Some(delay);
        }
    }

    /// Simulate asynchronous delivery failures reported by the broker
    pub fn set_delivery_failures(&self, count: u64) {
        self.delivery_failures.store(count, Ordering::SeqCst);
    }

    /// Messages accepted so far
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }

    /// Keys of accepted messages, in order
    pub fn keys(&self) -> Vec<String> {
        self.messages().into_iter().map(|m| m.key).collect()
    }

    /// Number of accepted messages at the time of each flush
    pub fn flushes(&self) -> Vec<usize> {
        self.flushes
            .lock()
            .map(|flushes| flushes.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<()> {
        let rejected = self
            .rejected_keys
            .lock()
            .map(|keys| keys.contains(key))
            .unwrap_or(false);
        if rejected {
            return Err(BrokerError::EnqueueFailed {
                key: key.to_string(),
                message: "Local: Queue full".to_string(),
            }
            .into());
        }

        self.messages
            .lock()
            .map_err(|e| ExportError::Other(format!("publisher lock poisoned: {e}")))?
            .push(PublishedMessage {
                topic: topic.to_string(),
                key: key.to_string(),
                value: value.to_string(),
            });

        if let Some(hook) = &self.on_publish {
            hook(key);
        }

        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        let delay = self.flush_delay.lock().ok().and_then(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_flush.load(Ordering::SeqCst) {
            return Err(BrokerError::FlushFailed("Local: Timed out".to_string()).into());
        }

        let accepted = self.messages.lock().map(|m| m.len()).unwrap_or_default();
        if let Ok(mut flushes) = self.flushes.lock() {
            flushes.push(accepted);
        }
        Ok(())
    }

    fn delivery_failures(&self) -> u64 {
        self.delivery_failures.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use futures::TryStreamExt;
    use mongodb::bson::{doc, DateTime as BsonDateTime};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn document(afid: i64, hour: u32) -> Document {
        doc! { "afid": afid, "updated": BsonDateTime::from_millis(at(hour).timestamp_millis()) }
    }

    #[tokio::test]
    async fn test_memory_source_applies_strict_cutoff() {
        let source = MemoryRecordSource::new(
            "afids",
            vec![document(1, 9), document(2, 10), document(3, 11)],
        );

        let all: Vec<RawRecord> = source.open_cursor(None, 2).await.unwrap().try_collect().await.unwrap();
        assert_eq!(all.len(), 3);

        let newer: Vec<RawRecord> = source
            .open_cursor(Some(at(10)), 2)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].get("afid"), Some(&mongodb::bson::Bson::Int64(3)));

        assert_eq!(source.opened_with(), vec![(None, 2), (Some(at(10)), 2)]);
    }

    #[tokio::test]
    async fn test_memory_source_string_dates_only_match_full_scan() {
        let source = MemoryRecordSource::new(
            "afids",
            vec![
                doc! { "afid": 1_i64, "updated": "2024-03-01T12:00:00Z" },
                document(2, 12),
            ],
        );

        let all: Vec<RawRecord> = source.open_cursor(None, 10).await.unwrap().try_collect().await.unwrap();
        assert_eq!(all.len(), 2);

        let windowed: Vec<RawRecord> = source
            .open_cursor(Some(at(9)), 10)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        assert_eq!(windowed.len(), 1);
        assert_eq!(windowed[0].get("afid"), Some(&mongodb::bson::Bson::Int64(2)));
    }

    #[tokio::test]
    async fn test_recording_publisher_rejects_keys() {
        let publisher = RecordingPublisher::new();
        publisher.reject_key("7");

        assert!(publisher.publish("t", "7", "{}").is_err());
        publisher.publish("t", "8", "{}").unwrap();
        publisher.flush(Duration::from_secs(1)).await.unwrap();

        assert_eq!(publisher.keys(), vec!["8".to_string()]);
        assert_eq!(publisher.flushes(), vec![1]);
    }
}
