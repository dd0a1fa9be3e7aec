//! Adapter factory
//!
//! Builds the concrete backends for a run from configuration.

use crate::adapters::checkpoint::FileCheckpointStorage;
use crate::adapters::kafka::{DryRunPublisher, KafkaPublisher};
use crate::adapters::mongodb::MongoRecordSource;
use crate::adapters::traits::{CheckpointStorage, Publisher, RecordSource};
use crate::config::AppConfig;
use crate::domain::Result;
use std::sync::Arc;

/// Connect to the document store
///
/// # Errors
///
/// Returns a connection-class error if the store is unreachable.
pub async fn create_record_source(config: &AppConfig) -> Result<Arc<dyn RecordSource>> {
    tracing::info!(collection = %config.source.collection, "Creating MongoDB record source");
    let source = MongoRecordSource::connect(&config.source).await?;
    Ok(Arc::new(source) as Arc<dyn RecordSource>)
}

/// Create the publisher, or a dry-run stand-in
///
/// # Errors
///
/// Returns an error if the Kafka producer cannot be created.
pub fn create_publisher(config: &AppConfig) -> Result<Arc<dyn Publisher>> {
    if config.export.dry_run {
        tracing::info!("Dry run: messages will not be sent to Kafka");
        return Ok(Arc::new(DryRunPublisher::new()) as Arc<dyn Publisher>);
    }

    let publisher = KafkaPublisher::new(&config.broker, config.export.batch_size)?;
    Ok(Arc::new(publisher) as Arc<dyn Publisher>)
}

/// Checkpoint storage at the configured path
pub fn create_checkpoint_storage(config: &AppConfig) -> Arc<dyn CheckpointStorage> {
    Arc::new(FileCheckpointStorage::new(&config.state.checkpoint_path))
}
