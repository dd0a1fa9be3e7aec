//! State manager for checkpoint persistence
//!
//! Wraps a [`CheckpointStorage`] backend and decides which time window the
//! next run covers.

use crate::adapters::traits::CheckpointStorage;
use crate::domain::Result;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;

/// Where the lower bound of a run's time window comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Initial run: scan the whole collection
    FullScan,
    /// Records changed after the last successful run
    Checkpoint(DateTime<Utc>),
    /// No usable checkpoint: records changed within the lookback window
    Lookback(DateTime<Utc>),
}

impl Cutoff {
    /// Compute the cutoff for a run
    ///
    /// `initial_run` always wins. Otherwise a stored checkpoint is used, and
    /// `now - lookback` is the fallback, saturating at the earliest
    /// representable instant.
    ///
    /// # Examples
    ///
    /// ```
    /// use afid_export::core::state::Cutoff;
    /// use chrono::{Duration, TimeZone, Utc};
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();
    /// let cutoff = Cutoff::resolve(false, None, Duration::hours(24), now);
    ///
    /// assert_eq!(cutoff.timestamp(), Some(now - Duration::hours(24)));
    /// ```
    pub fn resolve(
        initial_run: bool,
        checkpoint: Option<DateTime<Utc>>,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        if initial_run {
            return Cutoff::FullScan;
        }

        match checkpoint {
            Some(last_run) => Cutoff::Checkpoint(last_run),
            None => Cutoff::Lookback(
                now.checked_sub_signed(lookback)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC),
            ),
        }
    }

    /// Lower bound passed to the source, `None` for a full scan
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Cutoff::FullScan => None,
            Cutoff::Checkpoint(ts) | Cutoff::Lookback(ts) => Some(*ts),
        }
    }

    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Cutoff::FullScan => "full_scan",
            Cutoff::Checkpoint(_) => "checkpoint",
            Cutoff::Lookback(_) => "lookback",
        }
    }
}

impl fmt::Display for Cutoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cutoff::FullScan => write!(f, "none (full scan)"),
            Cutoff::Checkpoint(ts) => write!(f, "{} (from checkpoint)", ts.to_rfc3339()),
            Cutoff::Lookback(ts) => write!(f, "{} (lookback window)", ts.to_rfc3339()),
        }
    }
}

/// State manager for checkpoint persistence
pub struct StateManager {
    /// Checkpoint storage backend
    storage: Arc<dyn CheckpointStorage>,
}

impl StateManager {
    /// Create a new StateManager with a checkpoint storage backend
    pub fn new_with_storage(storage: Arc<dyn CheckpointStorage>) -> Self {
        Self { storage }
    }

    /// Load the last checkpoint
    ///
    /// A missing checkpoint is normal. An unreadable one is logged and treated
    /// as missing so the run can fall back to the lookback window.
    pub async fn load_checkpoint(&self) -> Option<DateTime<Utc>> {
        match self.storage.read().await {
            Ok(Some(last_run)) => {
                tracing::info!(
                    location = %self.storage.location(),
                    last_run = %last_run.to_rfc3339(),
                    "Loaded checkpoint"
                );
                Some(last_run)
            }
            Ok(None) => {
                tracing::info!(
                    location = %self.storage.location(),
                    "No checkpoint found"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    location = %self.storage.location(),
                    error = %e,
                    "Checkpoint unreadable, ignoring it"
                );
                None
            }
        }
    }

    /// Persist a new checkpoint, replacing the previous one
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend fails to write.
    pub async fn save_checkpoint(&self, timestamp: DateTime<Utc>) -> Result<()> {
        tracing::info!(
            location = %self.storage.location(),
            last_run = %timestamp.to_rfc3339(),
            "Writing checkpoint"
        );

        self.storage.write(timestamp).await
    }

    /// Load the checkpoint and compute the cutoff for a run starting at `now`
    pub async fn resolve_cutoff(
        &self,
        initial_run: bool,
        lookback: Duration,
        now: DateTime<Utc>,
    ) -> Cutoff {
        if initial_run {
            return Cutoff::FullScan;
        }

        let checkpoint = self.load_checkpoint().await;
        Cutoff::resolve(false, checkpoint, lookback, now)
    }

    /// Where checkpoints are stored
    pub fn location(&self) -> String {
        self.storage.location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::checkpoint::MemoryCheckpointStorage;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_initial_run_ignores_checkpoint() {
        let last_run = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let cutoff = Cutoff::resolve(true, Some(last_run), Duration::hours(168), now());

        assert_eq!(cutoff, Cutoff::FullScan);
        assert_eq!(cutoff.timestamp(), None);
    }

    #[test]
    fn test_checkpoint_wins_over_lookback() {
        let last_run = Utc.with_ymd_and_hms(2024, 3, 7, 12, 0, 0).unwrap();
        let cutoff = Cutoff::resolve(false, Some(last_run), Duration::hours(1), now());

        assert_eq!(cutoff, Cutoff::Checkpoint(last_run));
        assert_eq!(cutoff.kind(), "checkpoint");
    }

    #[test]
    fn test_lookback_fallback() {
        let cutoff = Cutoff::resolve(false, None, Duration::hours(168), now());
        assert_eq!(
            cutoff.timestamp(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
        assert!(cutoff.to_string().contains("lookback"));
    }

    #[test]
    fn test_oversized_lookback_saturates() {
        let lookback = Duration::hours(i64::from(u32::MAX));
        let cutoff = Cutoff::resolve(false, None, lookback, now());

        assert_eq!(cutoff, Cutoff::Lookback(DateTime::<Utc>::MIN_UTC));
    }

    #[tokio::test]
    async fn test_state_manager_roundtrip() {
        let storage = Arc::new(MemoryCheckpointStorage::new());
        let manager = StateManager::new_with_storage(storage.clone());

        assert!(manager.load_checkpoint().await.is_none());

        manager.save_checkpoint(now()).await.unwrap();
        assert_eq!(manager.load_checkpoint().await, Some(now()));

        let cutoff = manager
            .resolve_cutoff(false, Duration::hours(24), now())
            .await;
        assert_eq!(cutoff, Cutoff::Checkpoint(now()));
    }

    #[tokio::test]
    async fn test_unreadable_checkpoint_falls_back_to_lookback() {
        let storage = Arc::new(MemoryCheckpointStorage::new());
        storage.fail_reads(true);
        let manager = StateManager::new_with_storage(storage);

        assert!(manager.load_checkpoint().await.is_none());

        let cutoff = manager
            .resolve_cutoff(false, Duration::hours(24), now())
            .await;
        assert_eq!(cutoff, Cutoff::Lookback(now() - Duration::hours(24)));
    }
}
