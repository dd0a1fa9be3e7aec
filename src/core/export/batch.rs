//! Flush cadence tracking
//!
//! The publisher is flushed every `batch_size` records pulled from the cursor,
//! whether or not they were valid, and once more at the end of the run.

/// Progress is logged once per this many flushes
pub const PROGRESS_LOG_INTERVAL: u64 = 10;

/// Counts records between flushes
#[derive(Debug, Clone)]
pub struct BatchTracker {
    batch_size: usize,
    since_flush: usize,
    flushes: u64,
}

impl BatchTracker {
    /// Create a tracker; a zero batch size is treated as 1
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            since_flush: 0,
            flushes: 0,
        }
    }

    /// Note one consumed record; returns true when a flush is due
    pub fn record_consumed(&mut self) -> bool {
        self.since_flush += 1;
        self.since_flush >= self.batch_size
    }

    /// Note a completed flush
    pub fn flushed(&mut self) {
        self.since_flush = 0;
        self.flushes += 1;
    }

    /// Whether progress should be logged after the latest flush
    pub fn progress_due(&self) -> bool {
        self.flushes > 0 && self.flushes % PROGRESS_LOG_INTERVAL == 0
    }

    /// Records consumed since the last flush
    pub fn pending(&self) -> usize {
        self.since_flush
    }

    /// Completed flushes
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}
