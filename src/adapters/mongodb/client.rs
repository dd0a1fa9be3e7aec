//! MongoDB record source

use crate::adapters::traits::{RecordSource, RecordStream};
use crate::config::SourceConfig;
use crate::domain::record::UPDATED_FIELD;
use crate::domain::{ExportError, RawRecord, Result, SourceError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use mongodb::bson::{self, doc, Document};
use mongodb::options::{ClientOptions, FindOptions};
use mongodb::{Client, Collection, Database};
use secrecy::ExposeSecret;

/// Cursor-based reader over one MongoDB collection
pub struct MongoRecordSource {
    database: Database,
    collection: Collection<Document>,
    database_name: String,
    collection_name: String,
}

impl MongoRecordSource {
    /// Connect and verify the store is reachable
    ///
    /// The database is taken from the connection string path.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::ConnectionFailed` if the connection string cannot
    /// be parsed or the client cannot be built, and `SourceError::PingFailed`
    /// if the ping fails.
    pub async fn connect(config: &SourceConfig) -> Result<Self> {
        let options = ClientOptions::parse(config.connection_string.expose_secret().as_str())
            .await
            .map_err(|e| SourceError::ConnectionFailed(e.to_string()))?;

        let database_name = options
            .default_database
            .clone()
            .or_else(|| config.database_name())
            .ok_or_else(|| {
                ExportError::Configuration(
                    "MongoDB connection string does not name a database".to_string(),
                )
            })?;

        let client =
            Client::with_options(options).map_err(|e| SourceError::ConnectionFailed(e.to_string()))?;
        let database = client.database(&database_name);
        let collection = database.collection::<Document>(&config.collection);

        let source = Self {
            database,
            collection,
            database_name,
            collection_name: config.collection.clone(),
        };

        source.ping().await?;

        tracing::info!(
            database = %source.database_name,
            collection = %source.collection_name,
            "Connected to MongoDB"
        );

        Ok(source)
    }

    /// Database the collection lives in
    pub fn database_name(&self) -> &str {
        &self.database_name
    }
}

/// Query filter for records changed strictly after `cutoff`
///
/// BSON datetimes have millisecond precision. Comparing against the cutoff
/// truncated to milliseconds keeps the strict inequality exact.
pub fn cutoff_filter(cutoff: Option<DateTime<Utc>>) -> Document {
    match cutoff {
        Some(ts) => doc! {
            UPDATED_FIELD: { "$gt": bson::DateTime::from_millis(ts.timestamp_millis()) }
        },
        None => Document::new(),
    }
}

#[async_trait]
impl RecordSource for MongoRecordSource {
    async fn ping(&self) -> Result<()> {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| SourceError::PingFailed(e.to_string()))?;
        Ok(())
    }

    async fn open_cursor(
        &self,
        cutoff: Option<DateTime<Utc>>,
        page_size: usize,
    ) -> Result<RecordStream> {
        let filter = cutoff_filter(cutoff);
        let options = FindOptions::builder()
            .batch_size(u32::try_from(page_size).unwrap_or(u32::MAX))
            .build();

        tracing::debug!(
            collection = %self.collection_name,
            filter = %filter,
            page_size,
            "Opening cursor"
        );

        let cursor = self
            .collection
            .find(filter, options)
            .await
            .map_err(|e| SourceError::CursorOpenFailed {
                collection: self.collection_name.clone(),
                message: e.to_string(),
            })?;

        let records = cursor.map(|item| {
            item.map(RawRecord::new)
                .map_err(|e| ExportError::from(SourceError::CursorAdvanceFailed(e.to_string())))
        });

        Ok(records.boxed())
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use mongodb::bson::Bson;

    #[test]
    fn test_no_cutoff_matches_everything() {
        assert!(cutoff_filter(None).is_empty());
    }

    #[test]
    fn test_cutoff_filter_is_strict_on_updated() {
        let cutoff = Utc.timestamp_opt(1_709_287_200, 250_000_000).unwrap();
        let filter = cutoff_filter(Some(cutoff));

        let condition = filter.get_document("updated").unwrap();
        assert_eq!(condition.len(), 1);
        match condition.get("$gt") {
            Some(Bson::DateTime(dt)) => assert_eq!(dt.timestamp_millis(), 1_709_287_200_250),
            other => panic!("unexpected condition: {other:?}"),
        }
        assert!(filter.get("created").is_none());
    }
}
