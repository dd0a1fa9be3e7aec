//! Export coordinator - main orchestrator for the export process
//!
//! One run reads the checkpoint, picks the time window, streams records from
//! the source, publishes each valid one by key and flushes on a fixed cadence.
//! The checkpoint is written only after a complete pass.

use crate::adapters::factory::{
    create_checkpoint_storage, create_publisher, create_record_source,
};
use crate::adapters::traits::{CheckpointStorage, Publisher, RecordSource};
use crate::config::AppConfig;
use crate::core::export::batch::BatchTracker;
use crate::core::export::summary::ExportSummary;
use crate::core::state::{Cutoff, StateManager};
use crate::core::transform::transform_record;
use crate::domain::record::AFID_FIELD;
use crate::domain::{ExportError, RawRecord, Result};
use chrono::Utc;
use futures::StreamExt;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;

/// Phase of an export run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Connecting,
    Scanning,
    Publishing,
    Flushing,
    Checkpointing,
    Done,
    Failed,
}

impl RunPhase {
    /// Whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Connecting)
                | (Connecting, Scanning)
                | (Connecting, Failed)
                | (Scanning, Publishing)
                | (Scanning, Flushing)
                | (Scanning, Failed)
                | (Publishing, Scanning)
                | (Publishing, Flushing)
                | (Publishing, Failed)
                | (Flushing, Scanning)
                | (Flushing, Checkpointing)
                | (Flushing, Done)
                | (Flushing, Failed)
                | (Checkpointing, Done)
                | (Checkpointing, Failed)
        )
    }

    /// Whether the run has ended
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Idle => "idle",
            RunPhase::Connecting => "connecting",
            RunPhase::Scanning => "scanning",
            RunPhase::Publishing => "publishing",
            RunPhase::Flushing => "flushing",
            RunPhase::Checkpointing => "checkpointing",
            RunPhase::Done => "done",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a flush that can be interrupted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushOutcome {
    Completed,
    Cancelled,
}

/// State local to one invocation of [`ExportCoordinator::execute_export`]
struct RunState {
    phase: RunPhase,
    summary: ExportSummary,
    tracker: BatchTracker,
}

impl RunState {
    fn new(batch_size: usize, dry_run: bool) -> Self {
        Self {
            phase: RunPhase::Idle,
            summary: ExportSummary::new(Cutoff::FullScan, dry_run),
            tracker: BatchTracker::new(batch_size),
        }
    }

    fn enter(&mut self, next: RunPhase) {
        if !self.phase.can_transition_to(next) {
            tracing::warn!(from = %self.phase, to = %next, "Unexpected run phase transition");
        }
        tracing::trace!(from = %self.phase, to = %next, "Run phase changed");
        self.phase = next;
    }

    fn fail(&mut self, error: ExportError) -> ExportError {
        self.enter(RunPhase::Failed);
        tracing::error!(
            error = %error,
            records_read = self.summary.records_read,
            records_published = self.summary.records_published,
            "Export run failed"
        );
        error
    }
}

/// Export coordinator
pub struct ExportCoordinator {
    config: AppConfig,
    source: Arc<dyn RecordSource>,
    publisher: Arc<dyn Publisher>,
    state_manager: Arc<StateManager>,
    shutdown_signal: watch::Receiver<bool>,
}

impl ExportCoordinator {
    /// Connect to the configured backends
    ///
    /// # Errors
    ///
    /// Returns a connection-class error if MongoDB is unreachable or the Kafka
    /// producer cannot be created.
    pub async fn new(config: AppConfig, shutdown_signal: watch::Receiver<bool>) -> Result<Self> {
        let source = create_record_source(&config).await?;
        let publisher = create_publisher(&config)?;
        let storage = create_checkpoint_storage(&config);

        Ok(Self::with_components(
            config,
            source,
            publisher,
            storage,
            shutdown_signal,
        ))
    }

    /// Build a coordinator around existing backends
    pub fn with_components(
        config: AppConfig,
        source: Arc<dyn RecordSource>,
        publisher: Arc<dyn Publisher>,
        storage: Arc<dyn CheckpointStorage>,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            source,
            publisher,
            state_manager: Arc::new(StateManager::new_with_storage(storage)),
            shutdown_signal,
        }
    }

    /// Execute one export run
    ///
    /// Returns the summary when the run reaches `Done`, including runs cut
    /// short by a shutdown signal (`summary.interrupted`). Those never write a
    /// checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be reached, the cursor cannot be
    /// opened or advanced, the final flush fails, or the checkpoint cannot be
    /// written. The checkpoint is left untouched in every case.
    pub async fn execute_export(&self) -> Result<ExportSummary> {
        let started = Instant::now();
        let export = &self.config.export;
        let mut run = RunState::new(export.batch_size, export.dry_run);

        tracing::info!(
            collection = %self.source.collection_name(),
            topic = %self.config.broker.topic,
            batch_size = export.batch_size,
            initial_run = export.initial_run,
            dry_run = export.dry_run,
            "Starting export run"
        );

        run.enter(RunPhase::Connecting);
        if let Err(e) = self.source.ping().await {
            return Err(run.fail(e));
        }

        let cutoff = self
            .state_manager
            .resolve_cutoff(export.initial_run, export.lookback(), Utc::now())
            .await;
        run.summary.cutoff = cutoff;
        tracing::info!(cutoff = %cutoff, kind = cutoff.kind(), "Resolved export window");

        run.enter(RunPhase::Scanning);
        let mut records = match self
            .source
            .open_cursor(cutoff.timestamp(), export.batch_size)
            .await
        {
            Ok(records) => records,
            Err(e) => return Err(run.fail(e)),
        };

        let mut interrupted = false;
        loop {
            if self.shutdown_requested() {
                interrupted = true;
                break;
            }

            let mut signal = self.shutdown_signal.clone();
            let next = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut signal) => {
                    interrupted = true;
                    break;
                }
                next = records.next() => next,
            };

            let record = match next {
                None => break,
                Some(Ok(record)) => record,
                Some(Err(e)) => {
                    self.best_effort_flush().await;
                    return Err(run.fail(e));
                }
            };

            run.summary.records_read += 1;
            self.process_record(&record, &mut run);

            if run.tracker.record_consumed() {
                run.enter(RunPhase::Flushing);
                match self.flush(false).await {
                    Ok(FlushOutcome::Completed) => {
                        run.tracker.flushed();
                        if run.tracker.progress_due() {
                            crate::log_batch_progress!(
                                run.tracker.flushes(),
                                run.summary.records_read,
                                run.summary.records_published
                            );
                        }
                    }
                    Ok(FlushOutcome::Cancelled) => {
                        interrupted = true;
                        break;
                    }
                    Err(e) => {
                        // Messages stay queued; the final flush decides the run
                        tracing::warn!(
                            error = %e,
                            pending = run.tracker.pending(),
                            "Periodic flush did not complete"
                        );
                    }
                }
                run.enter(RunPhase::Scanning);
            }
        }
        drop(records);

        if interrupted {
            tracing::warn!(
                records_read = run.summary.records_read,
                "Shutdown requested, stopping export before the cursor is exhausted"
            );
        }

        run.enter(RunPhase::Flushing);
        match self.flush(interrupted).await {
            Ok(FlushOutcome::Completed) => run.tracker.flushed(),
            Ok(FlushOutcome::Cancelled) => {
                tracing::warn!("Shutdown requested during final flush");
                interrupted = true;
            }
            Err(e) => return Err(run.fail(e)),
        }

        run.summary.flushes = run.tracker.flushes();
        run.summary.delivery_failures = self.publisher.delivery_failures();
        run.summary.interrupted = interrupted;

        if interrupted {
            tracing::warn!("Export interrupted, checkpoint not updated");
        } else if export.dry_run {
            tracing::info!("Dry run, checkpoint not updated");
        } else {
            run.enter(RunPhase::Checkpointing);
            let completed_at = Utc::now();
            if let Err(e) = self.state_manager.save_checkpoint(completed_at).await {
                return Err(run.fail(e));
            }
            run.summary.checkpoint = Some(completed_at);
        }

        run.enter(RunPhase::Done);
        let summary = run.summary.with_duration(started.elapsed());
        crate::log_run_complete!(summary.records_published, summary.duration);
        summary.log_summary();

        Ok(summary)
    }

    /// Transform and publish one record, updating counters
    fn process_record(&self, record: &RawRecord, run: &mut RunState) {
        let attributes = match transform_record(record) {
            Ok(attributes) => attributes,
            Err(e) => {
                run.summary.records_skipped += 1;
                tracing::warn!(
                    error = %e,
                    afid = ?record.get(AFID_FIELD),
                    "Skipping invalid record"
                );
                return;
            }
        };

        run.enter(RunPhase::Publishing);
        let key = attributes.key();
        let outcome = attributes
            .to_payload()
            .map_err(ExportError::from)
            .and_then(|payload| {
                self.publisher
                    .publish(&self.config.broker.topic, &key, &payload)
            });

        match outcome {
            Ok(()) => run.summary.records_published += 1,
            Err(e) => {
                run.summary.publish_failures += 1;
                tracing::error!(key = %key, error = %e, "Failed to publish record");
            }
        }
        run.enter(RunPhase::Scanning);
    }

    /// Flush the publisher, giving up early if a shutdown arrives
    ///
    /// Once the run is already stopping, only the flush timeout applies.
    async fn flush(&self, stopping: bool) -> Result<FlushOutcome> {
        let timeout = self.config.broker.flush_timeout();
        if stopping {
            self.publisher.flush(timeout).await?;
            return Ok(FlushOutcome::Completed);
        }

        let mut signal = self.shutdown_signal.clone();
        tokio::select! {
            result = self.publisher.flush(timeout) => result.map(|_| FlushOutcome::Completed),
            _ = wait_for_shutdown(&mut signal) => Ok(FlushOutcome::Cancelled),
        }
    }

    /// Flush before bailing out so already queued messages still go out
    async fn best_effort_flush(&self) {
        if let Err(e) = self
            .publisher
            .flush(self.config.broker.flush_timeout())
            .await
        {
            tracing::warn!(error = %e, "Flush after failure did not complete");
        }
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown_signal.borrow()
    }
}

/// Resolve once the shutdown flag is set; never resolves if the sender is gone
async fn wait_for_shutdown(signal: &mut watch::Receiver<bool>) {
    loop {
        if *signal.borrow_and_update() {
            return;
        }
        if signal.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::checkpoint::MemoryCheckpointStorage;
    use crate::adapters::memory::{MemoryRecordSource, RecordingPublisher};
    use crate::config::{
        secret_string, AppConfig, ApplicationConfig, BrokerConfig, ExportConfig, LoggingConfig,
        SourceConfig, StateConfig,
    };
    use crate::domain::SourceError;
    use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
    use std::time::Duration;

    fn config(batch_size: usize) -> AppConfig {
        AppConfig {
            application: ApplicationConfig::default(),
            source: SourceConfig {
                connection_string: secret_string("mongodb://localhost:27017/marketing".to_string()),
                collection: "afids".to_string(),
            },
            broker: BrokerConfig {
                brokers: "localhost:9092".to_string(),
                client_id: "afid-export".to_string(),
                topic: "afid-attributes".to_string(),
                flush_timeout_secs: 5,
                ssl_key_pem: None,
                ssl_certificate_pem: None,
                ssl_ca_pem: None,
            },
            export: ExportConfig {
                batch_size,
                initial_run: true,
                lookback_hours: 168,
                dry_run: false,
            },
            state: StateConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    fn record(afid: i64) -> Document {
        doc! { "afid": afid, "updated": BsonDateTime::now() }
    }

    struct Harness {
        coordinator: ExportCoordinator,
        source: Arc<MemoryRecordSource>,
        publisher: Arc<RecordingPublisher>,
        storage: Arc<MemoryCheckpointStorage>,
        shutdown_tx: watch::Sender<bool>,
    }

    fn harness(config: AppConfig, documents: Vec<Document>) -> Harness {
        let source = Arc::new(MemoryRecordSource::new("afids", documents));
        let publisher = Arc::new(RecordingPublisher::new());
        let storage = Arc::new(MemoryCheckpointStorage::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let coordinator = ExportCoordinator::with_components(
            config,
            source.clone(),
            publisher.clone(),
            storage.clone(),
            shutdown_rx,
        );

        Harness {
            coordinator,
            source,
            publisher,
            storage,
            shutdown_tx,
        }
    }

    #[test]
    fn test_run_phase_transitions() {
        assert!(RunPhase::Idle.can_transition_to(RunPhase::Connecting));
        assert!(RunPhase::Connecting.can_transition_to(RunPhase::Failed));
        assert!(RunPhase::Scanning.can_transition_to(RunPhase::Failed));
        assert!(RunPhase::Flushing.can_transition_to(RunPhase::Checkpointing));
        assert!(RunPhase::Checkpointing.can_transition_to(RunPhase::Done));

        assert!(!RunPhase::Idle.can_transition_to(RunPhase::Scanning));
        assert!(!RunPhase::Done.can_transition_to(RunPhase::Scanning));
        assert!(!RunPhase::Failed.can_transition_to(RunPhase::Connecting));
        assert!(RunPhase::Done.is_terminal());
        assert!(!RunPhase::Flushing.is_terminal());
    }

    #[tokio::test]
    async fn test_flush_cadence_with_batch_of_two() {
        let h = harness(config(2), vec![record(1), record(2), record(3)]);

        let summary = h.coordinator.execute_export().await.unwrap();

        assert_eq!(h.publisher.keys(), vec!["1", "2", "3"]);
        assert_eq!(h.publisher.flushes(), vec![2, 3]);
        assert_eq!(summary.processed(), 3);
        assert_eq!(summary.flushes, 2);
        assert_eq!(h.storage.write_count(), 1);
        assert_eq!(summary.checkpoint, h.storage.current());
    }

    #[tokio::test]
    async fn test_flush_cadence_with_exact_multiple() {
        let h = harness(
            config(2),
            vec![record(1), record(2), record(3), record(4)],
        );

        let summary = h.coordinator.execute_export().await.unwrap();

        assert_eq!(h.publisher.keys(), vec!["1", "2", "3", "4"]);
        assert_eq!(h.publisher.flushes(), vec![2, 4, 4]);
        assert_eq!(summary.flushes, 3);
        assert_eq!(h.storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_records_are_skipped() {
        let h = harness(config(10), vec![record(0), record(42), doc! { "campaign": "x" }]);

        let summary = h.coordinator.execute_export().await.unwrap();

        assert_eq!(h.publisher.keys(), vec!["42"]);
        assert_eq!(summary.processed(), 1);
        assert_eq!(summary.records_read, 3);
        assert_eq!(summary.records_skipped, 2);
    }

    #[tokio::test]
    async fn test_ping_failure_fails_without_checkpoint() {
        let h = harness(config(10), vec![record(1)]);
        h.source.fail_ping(true);

        let err = h.coordinator.execute_export().await.unwrap_err();

        assert!(err.is_connection());
        assert!(h.publisher.keys().is_empty());
        assert_eq!(h.storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_cursor_failure_flushes_and_propagates() {
        let h = harness(config(10), vec![record(1), record(2), record(3)]);
        h.source.fail_after(2);

        let err = h.coordinator.execute_export().await.unwrap_err();

        assert!(matches!(err, ExportError::Source(_)));
        assert_eq!(h.publisher.keys(), vec!["1", "2"]);
        assert_eq!(h.publisher.flushes(), vec![2]);
        assert_eq!(h.storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_cursor_open_failure_publishes_nothing() {
        let h = harness(config(10), vec![record(1), record(2)]);
        h.source.fail_open(true);

        let err = h.coordinator.execute_export().await.unwrap_err();

        assert!(matches!(
            err,
            ExportError::Source(SourceError::CursorOpenFailed { .. })
        ));
        assert!(!err.is_connection());
        assert!(h.publisher.messages().is_empty());
        assert!(h.publisher.flushes().is_empty());
        assert_eq!(h.storage.write_count(), 0);
        assert_eq!(h.source.opened_with(), vec![(None, 10)]);
    }

    #[tokio::test]
    async fn test_shutdown_during_periodic_flush_skips_checkpoint() {
        let Harness {
            coordinator,
            publisher,
            storage,
            shutdown_tx,
            ..
        } = harness(config(2), vec![record(1), record(2), record(3)]);
        publisher.set_flush_delay(Duration::from_millis(300));

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            let _ = shutdown_tx.send(true);
        });

        let summary = coordinator.execute_export().await.unwrap();

        assert!(summary.interrupted);
        assert!(!summary.is_successful());
        assert!(summary.checkpoint.is_none());
        assert_eq!(publisher.keys(), vec!["1", "2"]);
        // Only the final flush completes; the periodic one was abandoned
        assert_eq!(publisher.flushes(), vec![2]);
        assert_eq!(storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_delivery_failures_are_reported() {
        let h = harness(config(10), vec![record(1), record(2)]);
        h.publisher.set_delivery_failures(3);

        let summary = h.coordinator.execute_export().await.unwrap();

        assert_eq!(summary.delivery_failures, 3);
        assert_eq!(summary.processed(), 2);
        assert!(!summary.is_successful());
        assert_eq!(h.storage.write_count(), 1);
    }

    #[tokio::test]
    async fn test_final_flush_failure_fails_run() {
        let h = harness(config(10), vec![record(1)]);
        h.publisher.fail_flush(true);

        let err = h.coordinator.execute_export().await.unwrap_err();

        assert!(matches!(err, ExportError::Broker(_)));
        assert_eq!(h.storage.write_count(), 0);
    }

    #[tokio::test]
    async fn test_checkpoint_write_failure_is_surfaced() {
        let h = harness(config(10), vec![record(1)]);
        h.storage.fail_writes(true);

        let err = h.coordinator.execute_export().await.unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert_eq!(h.publisher.keys(), vec!["1"]);
    }

    #[tokio::test]
    async fn test_dry_run_skips_checkpoint() {
        let mut cfg = config(10);
        cfg.export.dry_run = true;
        let h = harness(cfg, vec![record(1)]);

        let summary = h.coordinator.execute_export().await.unwrap();

        assert!(summary.dry_run);
        assert!(summary.checkpoint.is_none());
        assert_eq!(h.storage.write_count(), 0);
    }
}
