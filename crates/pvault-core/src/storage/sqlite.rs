//! SQLite record store
//!
//! The on-disk engine behind `RecordStore`. Records are large (media can be
//! embedded as data URLs), so each one gets its own row rather than living in
//! a single serialized blob.
//!
//! ## Tables
//!
//! - `records` - one row per record
//! - `record_tags` - ordered tags for each record
//!
//! rusqlite is blocking; every operation runs on tokio's blocking pool
//! against a connection shared behind a mutex.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::models::{Category, PromptRecord};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{init_schema, needs_init};
use crate::store::{RecordStore, StorageUsage};

/// SQLite-backed record store
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
    quota_bytes: Option<u64>,
}

impl SqliteStore {
    /// Open or create the database under the configured data directory
    ///
    /// Any failure to create the directory, open the file or initialize the
    /// schema is reported as an unavailable store.
    pub async fn open(config: &Config) -> StorageResult<Self> {
        let path = config.sqlite_path();
        let quota_bytes = config.storage_quota_bytes;

        let open_path = path.clone();
        let conn = tokio::task::spawn_blocking(move || open_connection(&open_path, quota_bytes))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))??;

        info!("Opened record store at {:?}", path);

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            quota_bytes,
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory(quota_bytes: Option<u64>) -> StorageResult<Self> {
        let path = PathBuf::from(":memory:");
        let conn = Connection::open_in_memory().map_err(|e| unavailable(&path, e))?;
        prepare_connection(&conn, quota_bytes).map_err(|e| unavailable(&path, e))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
            quota_bytes,
        })
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the connection on the blocking pool
    async fn run<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| StorageError::Task("connection lock poisoned".to_string()))?;
            f(&mut guard)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    async fn get_all(&self) -> StorageResult<Vec<PromptRecord>> {
        self.run(|conn| read_all(conn)).await
    }

    async fn save(&self, record: &PromptRecord) -> StorageResult<()> {
        debug!(id = %record.id, "saving record");
        let record = record.clone();
        let quota_bytes = self.quota_bytes;
        self.run(move |conn| {
            write_record(conn, &record)
                .map_err(|e| classify_write_error(e, &record.id, quota_bytes))
        })
        .await
    }

    async fn delete(&self, id: &str) -> StorageResult<()> {
        debug!(id, "deleting record");
        let id = id.to_string();
        self.run(move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM record_tags WHERE record_id = ?", params![id])?;
            tx.execute("DELETE FROM records WHERE id = ?", params![id])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> StorageResult<()> {
        info!("Clearing all records");
        self.run(|conn| {
            let tx = conn.transaction()?;
            // Order matters due to foreign keys
            tx.execute("DELETE FROM record_tags", [])?;
            tx.execute("DELETE FROM records", [])?;
            tx.commit()?;
            compact(conn);
            Ok(())
        })
        .await
    }

    async fn storage_usage(&self) -> StorageResult<Option<StorageUsage>> {
        self.run(|conn| {
            let page_size = pragma_u64(conn, "page_size")?;
            let page_count = pragma_u64(conn, "page_count")?;
            let free_pages = pragma_u64(conn, "freelist_count")?;
            let max_pages = pragma_u64(conn, "max_page_count")?;

            Ok(Some(StorageUsage {
                used_bytes: page_count.saturating_sub(free_pages) * page_size,
                quota_bytes: max_pages.saturating_mul(page_size),
            }))
        })
        .await
    }
}

// ==================== Connection setup ====================

fn open_connection(path: &Path, quota_bytes: Option<u64>) -> StorageResult<Connection> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StorageError::from_io(e, parent.to_path_buf()))?;
    }

    let conn = Connection::open(path).map_err(|e| unavailable(path, e))?;
    prepare_connection(&conn, quota_bytes).map_err(|e| unavailable(path, e))?;
    Ok(conn)
}

fn prepare_connection(conn: &Connection, quota_bytes: Option<u64>) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    if needs_init(conn) {
        init_schema(conn)?;
    }

    // max_page_count is per connection, so the quota is applied on every open
    if let Some(quota) = quota_bytes {
        let page_size: i64 = conn.pragma_query_value(None, "page_size", |row| row.get(0))?;
        let max_pages = (quota / page_size.max(1) as u64).max(1) as i64;
        let applied: i64 =
            conn.pragma_update_and_check(None, "max_page_count", max_pages, |row| row.get(0))?;
        debug!(quota, applied, "applied storage quota");
    }

    Ok(())
}

fn unavailable(path: &Path, error: rusqlite::Error) -> StorageError {
    StorageError::Unavailable {
        path: path.to_path_buf(),
        details: error.to_string(),
    }
}

fn pragma_u64(conn: &Connection, name: &str) -> StorageResult<u64> {
    let value: i64 = conn.pragma_query_value(None, name, |row| row.get(0))?;
    Ok(value.max(0) as u64)
}

/// SQLITE_FULL is what a write past max_page_count (or a full disk) returns
fn classify_write_error(error: rusqlite::Error, id: &str, quota_bytes: Option<u64>) -> StorageError {
    let is_full = matches!(
        &error,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::DiskFull
    );

    if is_full {
        StorageError::QuotaExceeded {
            id: id.to_string(),
            quota_bytes,
        }
    } else {
        StorageError::Database(error)
    }
}

// ==================== Row mapping ====================

struct RecordRow {
    id: String,
    title: String,
    prompt: String,
    negative_prompt: Option<String>,
    category: String,
    output_media_url: Option<String>,
    input_media_url: Option<String>,
    model_used: Option<String>,
    is_video: Option<bool>,
}

fn read_all(conn: &Connection) -> StorageResult<Vec<PromptRecord>> {
    let mut tags = read_tags(conn)?;

    let mut stmt = conn.prepare(
        r#"
        SELECT id, title, prompt, negative_prompt, category,
               output_media_url, input_media_url, model_used, is_video
        FROM records
        ORDER BY id
        "#,
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(RecordRow {
            id: row.get(0)?,
            title: row.get(1)?,
            prompt: row.get(2)?,
            negative_prompt: row.get(3)?,
            category: row.get(4)?,
            output_media_url: row.get(5)?,
            input_media_url: row.get(6)?,
            model_used: row.get(7)?,
            is_video: row.get(8)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        let row = row?;
        let category: Category = match row.category.parse() {
            Ok(category) => category,
            Err(e) => {
                warn!(id = %row.id, "Skipping unreadable record: {}", e);
                tags.remove(&row.id);
                continue;
            }
        };

        records.push(PromptRecord {
            tags: tags.remove(&row.id).unwrap_or_default(),
            id: row.id,
            title: row.title,
            prompt: row.prompt,
            negative_prompt: row.negative_prompt,
            category,
            output_media_url: row.output_media_url,
            input_media_url: row.input_media_url,
            model_used: row.model_used,
            is_video: row.is_video,
        });
    }

    Ok(records)
}

/// Give freed pages back so usage reflects a reset
///
/// The delete has already committed, so a failure here is only logged.
fn compact(conn: &Connection) -> bool {
    match conn.execute_batch("VACUUM;") {
        Ok(()) => true,
        Err(e) => {
            warn!("VACUUM after clear failed: {}", e);
            false
        }
    }
}

fn read_tags(conn: &Connection) -> StorageResult<HashMap<String, Vec<String>>> {
    let mut stmt =
        conn.prepare("SELECT record_id, tag FROM record_tags ORDER BY record_id, position")?;

    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
    for row in rows {
        let (record_id, tag) = row?;
        tags.entry(record_id).or_default().push(tag);
    }

    Ok(tags)
}

/// Upsert a record and rewrite its tags in one transaction
fn write_record(conn: &mut Connection, record: &PromptRecord) -> rusqlite::Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        r#"
        INSERT INTO records (id, title, prompt, negative_prompt, category,
                             output_media_url, input_media_url, model_used, is_video)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            prompt = excluded.prompt,
            negative_prompt = excluded.negative_prompt,
            category = excluded.category,
            output_media_url = excluded.output_media_url,
            input_media_url = excluded.input_media_url,
            model_used = excluded.model_used,
            is_video = excluded.is_video
        "#,
        params![
            record.id,
            record.title,
            record.prompt,
            record.negative_prompt,
            record.category.as_str(),
            record.output_media_url,
            record.input_media_url,
            record.model_used,
            record.is_video,
        ],
    )?;

    tx.execute(
        "DELETE FROM record_tags WHERE record_id = ?",
        params![record.id],
    )?;
    for (position, tag) in record.tags.iter().enumerate() {
        tx.execute(
            "INSERT INTO record_tags (record_id, position, tag) VALUES (?, ?, ?)",
            params![record.id, position as i64, tag],
        )?;
    }

    tx.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn sample(id: &str, category: Category) -> PromptRecord {
        let mut record = PromptRecord::with_id(id, category);
        record.set_title(format!("Title {}", id));
        record.set_prompt(format!("prompt for {}", id));
        record.set_output_media(Some(format!("https://cdn.example.com/{}.png", id)));
        record
    }

    #[tokio::test]
    async fn test_open_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        let store = SqliteStore::open(&config).await.unwrap();
        assert_eq!(store.path(), config.sqlite_path().as_path());
        assert!(config.sqlite_path().exists());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_get_all_preserves_fields() {
        let store = SqliteStore::open_in_memory(None).unwrap();

        let mut record = sample("1700000000001", Category::ImageToVideo);
        record.set_negative_prompt(Some("watermark".to_string()));
        record.set_input_media(Some("data:image/png;base64,AAAA".to_string()));
        record.set_model_used(Some("Veo 3".to_string()));
        record.set_is_video(Some(true));
        record.add_tag("zeta");
        record.add_tag("alpha");
        record.add_tag("mid");

        store.save(&record).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all, vec![record]);
        // Tag order is display order, not alphabetical
        assert_eq!(all[0].tags, vec!["zeta", "alpha", "mid"]);
    }

    #[tokio::test]
    async fn test_save_is_upsert_last_write_wins() {
        let store = SqliteStore::open_in_memory(None).unwrap();

        let mut record = sample("1", Category::General);
        record.add_tag("old");
        store.save(&record).await.unwrap();
        store.save(&record).await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);

        record.set_title("Renamed");
        record.set_tags(vec!["new".to_string()]);
        store.save(&record).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Renamed");
        assert_eq!(all[0].tags, vec!["new"]);
    }

    #[tokio::test]
    async fn test_distinct_ids_one_record_each() {
        let store = SqliteStore::open_in_memory(None).unwrap();

        for i in 0..10 {
            store
                .save(&sample(&i.to_string(), Category::TextToImage))
                .await
                .unwrap();
        }
        // Overwrite a few with new content
        let mut changed = sample("3", Category::TextToImage);
        changed.set_prompt("changed");
        store.save(&changed).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 10);
        let three = all.iter().find(|r| r.id == "3").unwrap();
        assert_eq!(three.prompt, "changed");
    }

    #[tokio::test]
    async fn test_delete_and_delete_again() {
        let store = SqliteStore::open_in_memory(None).unwrap();

        let mut record = sample("1", Category::General);
        record.add_tag("gone");
        store.save(&record).await.unwrap();
        store.save(&sample("2", Category::General)).await.unwrap();

        store.delete("1").await.unwrap();
        store.delete("1").await.unwrap();
        store.delete("never-existed").await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all.iter().all(|r| r.id != "1"));
    }

    #[tokio::test]
    async fn test_clear() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        store.save(&sample("1", Category::General)).await.unwrap();
        store.save(&sample("2", Category::General)).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_data_persists_across_reopens() {
        let temp_dir = TempDir::new().unwrap();
        let config = test_config(&temp_dir);

        {
            let store = SqliteStore::open(&config).await.unwrap();
            let mut record = sample("1700000000000", Category::TextToImage);
            record.add_tag("persist");
            store.save(&record).await.unwrap();
        }

        let store = SqliteStore::open(&config).await.unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tags, vec!["persist"]);
    }

    #[tokio::test]
    async fn test_open_unavailable_when_data_dir_is_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let config = Config {
            data_dir: blocker.join("pvault"),
            ..Config::default()
        };

        let err = SqliteStore::open(&config).await.err().unwrap();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_surfaced_and_not_applied() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            storage_quota_bytes: Some(64 * 1024),
            ..test_config(&temp_dir)
        };
        let store = SqliteStore::open(&config).await.unwrap();

        let mut huge = sample("big", Category::TextToImage);
        huge.set_output_media(Some(format!(
            "data:image/png;base64,{}",
            "A".repeat(512 * 1024)
        )));

        let err = store.save(&huge).await.unwrap_err();
        assert!(err.is_quota_exceeded(), "unexpected error: {err}");

        assert!(store.get_all().await.unwrap().is_empty());

        // Small records still fit
        store.save(&sample("small", Category::General)).await.unwrap();
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_storage_usage() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let before = store.storage_usage().await.unwrap().unwrap();

        let mut record = sample("1", Category::TextToImage);
        record.set_prompt("x".repeat(100 * 1024));
        store.save(&record).await.unwrap();

        let after = store.storage_usage().await.unwrap().unwrap();
        assert!(after.used_bytes > before.used_bytes);
        assert!(after.quota_bytes > after.used_bytes);
    }

    #[tokio::test]
    async fn test_storage_usage_reports_configured_quota() {
        let store = SqliteStore::open_in_memory(Some(1024 * 1024)).unwrap();
        let usage = store.storage_usage().await.unwrap().unwrap();
        assert_eq!(usage.quota_bytes, 1024 * 1024);
        assert!(usage.used_bytes <= usage.quota_bytes);
    }

    #[tokio::test]
    async fn test_unreadable_row_is_skipped() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        store.save(&sample("1", Category::General)).await.unwrap();
        store
            .run(|conn| {
                conn.execute(
                    "INSERT INTO records (id, title, prompt, category) VALUES ('x', 't', 'p', 'audio')",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let records = store.get_all().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "1");

        // The bad row can still be removed
        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_compact_failure_is_not_an_error() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        let compacted = store
            .run(|conn| {
                conn.execute_batch("BEGIN;")?;
                let compacted = compact(conn);
                conn.execute_batch("ROLLBACK;")?;
                Ok(compacted)
            })
            .await
            .unwrap();
        assert!(!compacted);

        store.save(&sample("1", Category::General)).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.get_all().await.unwrap().is_empty());
    }
}
