//! Catalog operations
//!
//! Pure functions over a snapshot of records (filtering, search, ordering)
//! plus the backup format: export serializes the whole collection as a JSON
//! array, import validates each element on its own and saves the ones that
//! pass through the store.
//!
//! Import is best effort. A malformed top-level payload rejects the whole
//! backup, but a bad element only rejects itself.

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Category, PromptRecord};
use crate::storage::StorageError;
use crate::store::RecordStore;

/// Errors from whole-collection catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The backup is not a JSON array
    #[error("Malformed backup: {0}")]
    MalformedBackup(String),

    #[error("Failed to serialize backup: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

// ==================== Filtering ====================

/// Case-insensitive substring match over title, prompt and every tag
///
/// Empty search text matches everything. Whitespace is part of the needle.
pub fn matches_search(record: &PromptRecord, search_text: &str) -> bool {
    let needle = search_text.to_lowercase();
    if needle.is_empty() {
        return true;
    }

    record.title.to_lowercase().contains(&needle)
        || record.prompt.to_lowercase().contains(&needle)
        || record
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(&needle))
}

/// Records in `category` that match `search_text`
pub fn filter(items: &[PromptRecord], category: Category, search_text: &str) -> Vec<PromptRecord> {
    items
        .iter()
        .filter(|r| r.category == category && matches_search(r, search_text))
        .cloned()
        .collect()
}

/// Records in any category that match `search_text`
pub fn search(items: &[PromptRecord], search_text: &str) -> Vec<PromptRecord> {
    items
        .iter()
        .filter(|r| matches_search(r, search_text))
        .cloned()
        .collect()
}

/// Order by id descending; ids are creation timestamps
///
/// Non-numeric ids (hand-edited or legacy backups) go last, in lexical order.
pub fn sort_newest_first(items: &mut [PromptRecord]) {
    items.sort_by(|a, b| match (numeric_id(a), numeric_id(b)) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.id.cmp(&b.id),
    });
}

fn numeric_id(record: &PromptRecord) -> Option<u128> {
    record.id.parse().ok()
}

/// Number of records per category, every category listed
pub fn category_counts(items: &[PromptRecord]) -> Vec<(Category, usize)> {
    Category::ALL
        .iter()
        .map(|c| (*c, items.iter().filter(|r| r.category == *c).count()))
        .collect()
}

// ==================== Export ====================

/// Serialize the full collection as a pretty-printed JSON array
pub fn export_all(items: &[PromptRecord]) -> Result<Vec<u8>, CatalogError> {
    Ok(serde_json::to_vec_pretty(items)?)
}

/// Conventional file name for a backup taken on `date`
pub fn backup_file_name(date: NaiveDate) -> String {
    format!("PromptVault_Backup_{}.json", date.format("%Y-%m-%d"))
}

// ==================== Import ====================

/// Why a backup element was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("entry is not an object")]
    NotAnObject,

    #[error("missing id")]
    MissingId,

    #[error("missing or unknown category{}", category_suffix(.0))]
    UnknownCategory(Option<String>),

    #[error("missing prompt")]
    MissingPrompt,

    #[error("field '{0}' has the wrong type")]
    InvalidField(&'static str),

    #[error("could not be saved: {0}")]
    StoreFailed(String),
}

/// Result of validating one backup element
#[derive(Debug, Clone, PartialEq)]
pub enum ImportEntry {
    Accepted(PromptRecord),
    Rejected(RejectReason),
}

/// A skipped backup element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position in the backup array
    pub index: usize,
    /// The element's id, when it had a usable one
    pub id: Option<String>,
    #[serde(flatten)]
    pub reason: RejectReason,
}

/// Aggregate outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub accepted: usize,
    pub rejected: usize,
    pub rejections: Vec<Rejection>,
}

impl ImportReport {
    fn reject(&mut self, index: usize, id: Option<String>, reason: RejectReason) {
        self.rejected += 1;
        self.rejections.push(Rejection { index, id, reason });
    }
}

/// Parse backup bytes into its elements
///
/// Anything other than a JSON array is a malformed backup.
pub fn parse_backup(bytes: &[u8]) -> Result<Vec<Value>, CatalogError> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| CatalogError::MalformedBackup(format!("invalid JSON: {}", e)))?;

    match value {
        Value::Array(entries) => Ok(entries),
        other => Err(CatalogError::MalformedBackup(format!(
            "expected a JSON array of prompts, found {}",
            json_kind(&other)
        ))),
    }
}

/// Check one backup element against the record schema
///
/// Required: a non-empty `id` (string or integer), a known `category` and a
/// non-empty `prompt`. Optional fields must have the right type when present.
pub fn validate_entry(value: &Value) -> ImportEntry {
    match parse_entry(value) {
        Ok(record) => ImportEntry::Accepted(record),
        Err(reason) => ImportEntry::Rejected(reason),
    }
}

fn parse_entry(value: &Value) -> Result<PromptRecord, RejectReason> {
    let Value::Object(map) = value else {
        return Err(RejectReason::NotAnObject);
    };

    let id = entry_id(value).ok_or(RejectReason::MissingId)?;

    let category = match map.get("category") {
        Some(Value::String(name)) => Category::ALL
            .into_iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| RejectReason::UnknownCategory(Some(name.clone())))?,
        _ => return Err(RejectReason::UnknownCategory(None)),
    };

    let prompt = match map.get("prompt") {
        Some(Value::String(p)) if !p.trim().is_empty() => p.clone(),
        _ => return Err(RejectReason::MissingPrompt),
    };

    Ok(PromptRecord {
        id,
        title: optional_string(map, "title")?.unwrap_or_default(),
        prompt,
        negative_prompt: optional_string(map, "negativePrompt")?,
        category,
        output_media_url: optional_string(map, "outputMediaUrl")?,
        input_media_url: optional_string(map, "inputMediaUrl")?,
        model_used: optional_string(map, "modelUsed")?,
        tags: tags(map)?,
        is_video: match map.get("isVideo") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(b)) => Some(*b),
            Some(_) => return Err(RejectReason::InvalidField("isVideo")),
        },
    })
}

/// The element's id if it has a usable one
fn entry_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(n) if n.is_u64() || n.is_i64() => Some(n.to_string()),
        _ => None,
    }
}

fn optional_string(
    map: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, RejectReason> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(RejectReason::InvalidField(key)),
    }
}

fn tags(map: &Map<String, Value>) -> Result<Vec<String>, RejectReason> {
    match map.get("tags") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(values)) => values
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or(RejectReason::InvalidField("tags"))
            })
            .collect(),
        Some(_) => Err(RejectReason::InvalidField("tags")),
    }
}

fn category_suffix(name: &Option<String>) -> String {
    name.as_deref()
        .map(|c| format!(" '{}'", c))
        .unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Import a backup, saving every valid element through the store
///
/// Each accepted element is saved on its own (upsert by id), so a failure
/// part way leaves the earlier elements in place. Per-element problems,
/// including a record too large for the store, are counted as rejections.
/// An unavailable store aborts the import.
pub async fn import_all(store: &dyn RecordStore, bytes: &[u8]) -> Result<ImportReport, CatalogError> {
    let entries = parse_backup(bytes)?;
    let mut report = ImportReport::default();

    for (index, value) in entries.iter().enumerate() {
        match validate_entry(value) {
            ImportEntry::Accepted(record) => match store.save(&record).await {
                Ok(()) => report.accepted += 1,
                Err(e) if e.is_unavailable() => return Err(e.into()),
                Err(e) => {
                    warn!(index, id = %record.id, "Failed to save imported record: {}", e);
                    report.reject(index, Some(record.id), RejectReason::StoreFailed(e.to_string()));
                }
            },
            ImportEntry::Rejected(reason) => {
                warn!(index, "Skipping backup entry: {}", reason);
                report.reject(index, entry_id(value), reason);
            }
        }
    }

    info!(
        accepted = report.accepted,
        rejected = report.rejected,
        "Import finished"
    );
    Ok(report)
}
