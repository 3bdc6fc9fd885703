//! Application state
//!
//! `Vault` pairs the store with an in-memory snapshot of the collection.
//! Mutations go to the store first and only touch the snapshot once the
//! store has accepted them, so a failed write never shows up in a later
//! query. Queries run over the snapshot and never hit storage.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::{self, CatalogError, ImportReport};
use crate::models::{Category, PromptRecord, ValidationError};
use crate::storage::StorageError;
use crate::store::{RecordStore, StorageUsage};

/// Minimum prefix length accepted by [`Vault::resolve`]
pub const MIN_ID_PREFIX: usize = 4;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("No prompt found with id '{0}'")]
    NotFound(String),

    #[error("Ambiguous id prefix '{prefix}' matches {count} prompts. Use more characters.")]
    AmbiguousId { prefix: String, count: usize },
}

pub type VaultResult<T> = Result<T, VaultError>;

/// A serialized backup and the number of records in it
#[derive(Debug)]
pub struct Backup {
    pub count: usize,
    pub bytes: Vec<u8>,
}

pub struct Vault {
    store: Arc<dyn RecordStore>,
    records: Vec<PromptRecord>,
    degraded: bool,
}

impl Vault {
    /// Load the full collection from the store
    ///
    /// An unavailable store is not fatal: the vault starts empty and reports
    /// itself as degraded. Writes will still fail against such a store.
    pub async fn load(store: Arc<dyn RecordStore>) -> VaultResult<Self> {
        let (records, degraded) = match store.get_all().await {
            Ok(records) => (records, false),
            Err(e) if e.is_unavailable() => {
                warn!("Storage unavailable, continuing with an empty collection: {}", e);
                (Vec::new(), true)
            }
            Err(e) => return Err(e.into()),
        };

        debug!(count = records.len(), degraded, "Loaded prompt collection");

        Ok(Self {
            store,
            records,
            degraded,
        })
    }

    /// Whether the store could not be read at startup
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The snapshot, in store order
    pub fn records(&self) -> &[PromptRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&PromptRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Find a record by exact id, or by a unique id prefix
    pub fn resolve(&self, id_or_prefix: &str) -> VaultResult<&PromptRecord> {
        let needle = id_or_prefix.trim();
        if let Some(record) = self.get(needle) {
            return Ok(record);
        }

        if needle.len() < MIN_ID_PREFIX {
            return Err(VaultError::NotFound(needle.to_string()));
        }

        let matches: Vec<&PromptRecord> = self
            .records
            .iter()
            .filter(|r| r.id.starts_with(needle))
            .collect();

        match matches.as_slice() {
            [] => Err(VaultError::NotFound(needle.to_string())),
            [record] => Ok(record),
            _ => Err(VaultError::AmbiguousId {
                prefix: needle.to_string(),
                count: matches.len(),
            }),
        }
    }

    /// Snapshot filtered by category and search text, newest first
    pub fn query(&self, category: Option<Category>, search_text: &str) -> Vec<PromptRecord> {
        let mut items = match category {
            Some(category) => catalog::filter(&self.records, category, search_text),
            None => catalog::search(&self.records, search_text),
        };
        catalog::sort_newest_first(&mut items);
        items
    }

    /// Validate and persist a new record, returning it with its final id
    ///
    /// The record's id is replaced when it collides with an existing one.
    pub async fn create(&mut self, mut record: PromptRecord) -> VaultResult<PromptRecord> {
        record.validate()?;
        record.id = self.unique_id(&record.id);

        self.store.save(&record).await?;
        info!(id = %record.id, category = %record.category, "Created prompt");

        self.records.push(record.clone());
        Ok(record)
    }

    /// Replace an existing record wholesale
    pub async fn update(&mut self, record: PromptRecord) -> VaultResult<()> {
        let Some(index) = self.records.iter().position(|r| r.id == record.id) else {
            return Err(VaultError::NotFound(record.id));
        };
        record.validate()?;

        self.store.save(&record).await?;
        info!(id = %record.id, "Updated prompt");

        self.records[index] = record;
        Ok(())
    }

    /// Delete a record; unknown ids are ignored
    pub async fn delete(&mut self, id: &str) -> VaultResult<()> {
        self.store.delete(id).await?;
        let before = self.records.len();
        self.records.retain(|r| r.id != id);

        if self.records.len() < before {
            info!(id, "Deleted prompt");
        }
        Ok(())
    }

    /// Remove every record
    pub async fn reset(&mut self) -> VaultResult<()> {
        self.store.clear().await?;
        info!(count = self.records.len(), "Cleared all prompts");
        self.records.clear();
        Ok(())
    }

    /// Serialize the persisted collection
    ///
    /// Reads from the store rather than the snapshot, so an unreadable store
    /// fails the export instead of producing a partial backup.
    pub async fn export(&self) -> VaultResult<Backup> {
        let mut records = self.store.get_all().await?;
        catalog::sort_newest_first(&mut records);
        Ok(Backup {
            count: records.len(),
            bytes: catalog::export_all(&records)?,
        })
    }

    /// Import a backup and reload the snapshot
    pub async fn import(&mut self, bytes: &[u8]) -> VaultResult<ImportReport> {
        let report = catalog::import_all(self.store.as_ref(), bytes).await?;
        self.reload().await?;
        Ok(report)
    }

    pub async fn storage_usage(&self) -> VaultResult<Option<StorageUsage>> {
        Ok(self.store.storage_usage().await?)
    }

    async fn reload(&mut self) -> VaultResult<()> {
        self.records = self.store.get_all().await?;
        self.degraded = false;
        Ok(())
    }

    /// `candidate` if free, otherwise the next free id after it
    ///
    /// Numeric ids are bumped by one; anything else gets a numeric suffix.
    fn unique_id(&self, candidate: &str) -> String {
        let taken = |id: &str| self.records.iter().any(|r| r.id == id);
        if !candidate.is_empty() && !taken(candidate) {
            return candidate.to_string();
        }

        if let Ok(start) = candidate.parse::<u64>() {
            let mut n = start;
            while let Some(next) = n.checked_add(1) {
                n = next;
                let id = n.to_string();
                if !taken(&id) {
                    return id;
                }
            }
        }

        (1u64..)
            .map(|n| format!("{}-{}", candidate, n))
            .find(|id| !taken(id))
            .unwrap_or_else(crate::models::new_record_id)
    }
}
