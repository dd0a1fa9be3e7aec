//! In-process checkpoint storage
//!
//! Used by tests and by embedders that manage run state themselves.

use crate::adapters::traits::CheckpointStorage;
use crate::domain::{ExportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Checkpoint held in memory, with switchable failure injection
#[derive(Debug, Default)]
pub struct MemoryCheckpointStorage {
    value: Mutex<Option<DateTime<Utc>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryCheckpointStorage {
    /// Empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-loaded with a checkpoint
    pub fn with_checkpoint(timestamp: DateTime<Utc>) -> Self {
        let storage = Self::default();
        if let Ok(mut value) = storage.value.lock() {
            *value = Some(timestamp);
        }
        storage
    }

    /// Make every subsequent read fail
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Current value, bypassing failure injection
    pub fn current(&self) -> Option<DateTime<Utc>> {
        self.value.lock().ok().and_then(|value| *value)
    }

    /// Number of successful writes
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStorage for MemoryCheckpointStorage {
    async fn read(&self) -> Result<Option<DateTime<Utc>>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ExportError::State("checkpoint read failed".to_string()));
        }
        Ok(self.current())
    }

    async fn write(&self, timestamp: DateTime<Utc>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ExportError::Io("checkpoint write failed".to_string()));
        }

        let mut value = self
            .value
            .lock()
            .map_err(|e| ExportError::State(format!("checkpoint lock poisoned: {e}")))?;
        *value = Some(timestamp);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
