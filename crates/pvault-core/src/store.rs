//! Record store interface
//!
//! `RecordStore` is the only way into durable storage. Every engine
//! (SQLite on disk, in-memory, the unavailable stand-in) implements the same
//! five operations, and nothing above this layer touches an engine directly.
//!
//! ## Usage
//!
//! ```ignore
//! let store = SqliteStore::open(&config).await?;
//!
//! store.save(&record).await?;
//! let records = store.get_all().await?;
//! ```

use async_trait::async_trait;
use serde::Serialize;

use crate::models::PromptRecord;
use crate::storage::StorageResult;

/// Asynchronous key-value persistence for prompt records, keyed by id
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every persisted record, in no particular order
    async fn get_all(&self) -> StorageResult<Vec<PromptRecord>>;

    /// Insert or fully replace the record with the same id
    ///
    /// Atomic per record. Fails with `QuotaExceeded` when it does not fit.
    async fn save(&self, record: &PromptRecord) -> StorageResult<()>;

    /// Remove the record with this id; missing ids are not an error
    async fn delete(&self, id: &str) -> StorageResult<()>;

    /// Remove every record
    async fn clear(&self) -> StorageResult<()>;

    /// Space used and available, when the engine can account for it
    async fn storage_usage(&self) -> StorageResult<Option<StorageUsage>>;
}

/// Aggregate storage accounting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: u64,
    pub quota_bytes: u64,
}

impl StorageUsage {
    /// Share of the quota in use, 0.0 - 100.0
    pub fn percent_used(&self) -> f64 {
        if self.quota_bytes == 0 {
            return 100.0;
        }
        (self.used_bytes as f64 / self.quota_bytes as f64 * 100.0).min(100.0)
    }

    /// e.g. "1.2 MB of 50.0 MB (2.4%)"
    pub fn to_human(&self) -> String {
        format!(
            "{} of {} ({:.1}%)",
            human_bytes(self.used_bytes),
            human_bytes(self.quota_bytes),
            self.percent_used()
        )
    }
}

/// Format a byte count with a binary unit suffix
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
