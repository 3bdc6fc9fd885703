//! In-memory record store
//!
//! Nothing survives the process. Used by tests and anywhere a throwaway
//! collection is enough. An optional byte quota, measured on each record's
//! JSON size, mimics a capacity-limited engine.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::models::PromptRecord;
use crate::storage::error::{StorageError, StorageResult};
use crate::store::{RecordStore, StorageUsage};

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<String, PromptRecord>>,
    quota_bytes: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses writes once `quota_bytes` would be exceeded
    pub fn with_quota(quota_bytes: u64) -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> StorageResult<std::sync::MutexGuard<'_, BTreeMap<String, PromptRecord>>> {
        self.records
            .lock()
            .map_err(|_| StorageError::Task("memory store lock poisoned".to_string()))
    }
}

fn record_size(record: &PromptRecord) -> StorageResult<u64> {
    serde_json::to_vec(record)
        .map(|bytes| bytes.len() as u64)
        .map_err(|e| StorageError::InvalidRecord {
            id: record.id.clone(),
            details: e.to_string(),
        })
}

fn total_size<'a>(records: impl Iterator<Item = &'a PromptRecord>) -> StorageResult<u64> {
    records.map(record_size).sum()
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_all(&self) -> StorageResult<Vec<PromptRecord>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    async fn save(&self, record: &PromptRecord) -> StorageResult<()> {
        let mut records = self.lock()?;

        if let Some(quota) = self.quota_bytes {
            let others = total_size(records.values().filter(|r| r.id != record.id))?;
            if others + record_size(record)? > quota {
                return Err(StorageError::QuotaExceeded {
                    id: record.id.clone(),
                    quota_bytes: Some(quota),
                });
            }
        }

        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        self.lock()?.remove(id);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.lock()?.clear();
        Ok(())
    }

    async fn storage_usage(&self) -> StorageResult<Option<StorageUsage>> {
        let Some(quota) = self.quota_bytes else {
            return Ok(None);
        };
        let used = total_size(self.lock()?.values())?;
        Ok(Some(StorageUsage {
            used_bytes: used,
            quota_bytes: quota,
        }))
    }
}
