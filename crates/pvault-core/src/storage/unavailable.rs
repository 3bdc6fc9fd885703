//! Stand-in for an engine that could not be opened
//!
//! Reads and writes both fail with `StorageError::Unavailable`, so the
//! application state can degrade to an empty collection while every
//! attempted mutation is still reported back to the caller.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::models::PromptRecord;
use crate::storage::error::{StorageError, StorageResult};
use crate::store::{RecordStore, StorageUsage};

pub struct UnavailableStore {
    path: PathBuf,
    details: String,
}

impl UnavailableStore {
    pub fn new(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            details: details.into(),
        }
    }

    /// Build from the error that prevented the real store from opening
    pub fn from_error(path: impl Into<PathBuf>, error: &StorageError) -> Self {
        Self::new(path, error.to_string())
    }

    fn error(&self) -> StorageError {
        StorageError::Unavailable {
            path: self.path.clone(),
            details: self.details.clone(),
        }
    }
}

#[async_trait]
impl RecordStore for UnavailableStore {
    async fn get_all(&self) -> StorageResult<Vec<PromptRecord>> {
        Err(self.error())
    }

    async fn save(&self, _record: &PromptRecord) -> StorageResult<()> {
        Err(self.error())
    }

    async fn delete(&self, _id: &str) -> StorageResult<()> {
        Err(self.error())
    }

    async fn clear(&self) -> StorageResult<()> {
        Err(self.error())
    }

    async fn storage_usage(&self) -> StorageResult<Option<StorageUsage>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    #[tokio::test]
    async fn test_every_operation_reports_unavailable() {
        let store = UnavailableStore::new("/nowhere/pvault.db", "disk unplugged");

        assert!(store.get_all().await.unwrap_err().is_unavailable());
        let record = PromptRecord::with_id("1", Category::General);
        assert!(store.save(&record).await.unwrap_err().is_unavailable());
        assert!(store.delete("1").await.unwrap_err().is_unavailable());
        assert!(store.clear().await.unwrap_err().is_unavailable());
        assert!(store.storage_usage().await.unwrap().is_none());
    }
}
