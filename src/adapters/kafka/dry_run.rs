//! Publisher that logs instead of sending

use crate::adapters::traits::Publisher;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Accepts every message and drops it
///
/// Used for `--dry-run`, where records are read and validated but nothing
/// reaches the broker.
#[derive(Debug, Default)]
pub struct DryRunPublisher {
    accepted: AtomicU64,
}

impl DryRunPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages accepted so far
    pub fn accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Publisher for DryRunPublisher {
    fn publish(&self, topic: &str, key: &str, value: &str) -> Result<()> {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(topic, key, bytes = value.len(), "Dry run: message not sent");
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_publisher_counts_and_flushes() {
        let publisher = DryRunPublisher::new();

        publisher.publish("afids", "1", "{}").unwrap();
        publisher.publish("afids", "2", "{}").unwrap();
        publisher.flush(Duration::from_secs(1)).await.unwrap();

        assert_eq!(publisher.accepted(), 2);
        assert_eq!(publisher.delivery_failures(), 0);
    }
}
