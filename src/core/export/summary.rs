//! Export summary and reporting
//!
//! Counters for one run. They live in the summary returned by the coordinator,
//! never in process-wide state.

use crate::core::state::Cutoff;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Summary of an export run
#[derive(Debug, Clone)]
pub struct ExportSummary {
    /// Window lower bound the run used
    pub cutoff: Cutoff,

    /// Records produced by the cursor
    pub records_read: u64,

    /// Records handed to the publisher successfully
    pub records_published: u64,

    /// Records rejected by validation
    pub records_skipped: u64,

    /// Records the publisher refused to enqueue
    pub publish_failures: u64,

    /// Messages the broker reported as undeliverable
    pub delivery_failures: u64,

    /// Completed flushes, the final one included
    pub flushes: u64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// The run stopped early because of a shutdown signal
    pub interrupted: bool,

    /// Messages were not actually sent
    pub dry_run: bool,

    /// Checkpoint written at the end of the run, if any
    pub checkpoint: Option<DateTime<Utc>>,
}

impl ExportSummary {
    /// Create an empty summary for a run over `cutoff`
    pub fn new(cutoff: Cutoff, dry_run: bool) -> Self {
        Self {
            cutoff,
            records_read: 0,
            records_published: 0,
            records_skipped: 0,
            publish_failures: 0,
            delivery_failures: 0,
            flushes: 0,
            duration: Duration::from_secs(0),
            interrupted: false,
            dry_run,
            checkpoint: None,
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Records forwarded to the broker
    pub fn processed(&self) -> u64 {
        self.records_published
    }

    /// Published records per second
    pub fn throughput(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.records_published as f64 / secs
    }

    /// The run completed and nothing was lost on the way
    pub fn is_successful(&self) -> bool {
        !self.interrupted && self.publish_failures == 0 && self.delivery_failures == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            cutoff = %self.cutoff,
            records_read = self.records_read,
            records_published = self.records_published,
            records_skipped = self.records_skipped,
            publish_failures = self.publish_failures,
            delivery_failures = self.delivery_failures,
            flushes = self.flushes,
            duration_ms = self.duration.as_millis() as u64,
            throughput = format!("{:.1}/s", self.throughput()),
            dry_run = self.dry_run,
            interrupted = self.interrupted,
            "Export summary"
        );

        if self.publish_failures > 0 || self.delivery_failures > 0 {
            tracing::warn!(
                publish_failures = self.publish_failures,
                delivery_failures = self.delivery_failures,
                "Some records did not reach the broker"
            );
        }
    }
}
