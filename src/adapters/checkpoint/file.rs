//! File-backed checkpoint storage

use crate::adapters::traits::CheckpointStorage;
use crate::core::state::Checkpoint;
use crate::domain::context::ResultExt;
use crate::domain::{ExportError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Checkpoint kept in a small JSON file
///
/// The file is overwritten on every write. Its parent directory is created on
/// demand.
#[derive(Debug, Clone)]
pub struct FileCheckpointStorage {
    path: PathBuf,
}

impl FileCheckpointStorage {
    /// Create storage backed by `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CheckpointStorage for FileCheckpointStorage {
    async fn read(&self) -> Result<Option<DateTime<Utc>>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read checkpoint file {}", self.path.display())
                })
            }
        };

        let checkpoint = Checkpoint::from_json(&contents).map_err(|e| {
            ExportError::State(format!(
                "Checkpoint file {} is corrupt: {e}",
                self.path.display()
            ))
        })?;

        Ok(Some(checkpoint.last_run_date))
    }

    async fn write(&self, timestamp: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.with_context(|| {
                    format!("Failed to create checkpoint directory {}", parent.display())
                })?;
            }
        }

        let json = Checkpoint::new(timestamp).to_json()?;
        tokio::fs::write(&self.path, json)
            .await
            .with_context(|| format!("Failed to write checkpoint file {}", self.path.display()))
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_reads_as_none() {
        let dir = TempDir::new().unwrap();
        let storage = FileCheckpointStorage::new(dir.path().join("last_run.json"));

        assert_eq!(storage.read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_creates_directory_and_roundtrips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("state").join("last_run.json");
        let storage = FileCheckpointStorage::new(&path);
        let instant = Utc.timestamp_opt(1_709_287_200, 5_000_000).unwrap();

        storage.write(instant).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"LastRunDate\": \"2024-03-01T10:00:00.005Z\""));
        assert_eq!(storage.read().await.unwrap(), Some(instant));
    }

    #[tokio::test]
    async fn test_write_overwrites_previous_checkpoint() {
        let dir = TempDir::new().unwrap();
        let storage = FileCheckpointStorage::new(dir.path().join("last_run.json"));
        let first = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        storage.write(first).await.unwrap();
        storage.write(second).await.unwrap();

        assert_eq!(storage.read().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_state_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_run.json");
        std::fs::write(&path, "{\"LastRunDate\": 17").unwrap();

        let err = FileCheckpointStorage::new(&path).read().await.unwrap_err();
        assert!(matches!(err, ExportError::State(_)));
    }

    #[tokio::test]
    async fn test_write_fails_when_parent_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();

        let storage = FileCheckpointStorage::new(blocker.join("last_run.json"));
        let err = storage.write(Utc::now()).await.unwrap_err();

        assert!(matches!(err, ExportError::Io(_)));
        assert!(err.to_string().contains("checkpoint directory"));
    }
}
