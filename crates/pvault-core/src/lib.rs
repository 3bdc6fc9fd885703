//! pvault core library
//!
//! A local catalog of AI-generation prompts: each record carries a title,
//! prompt text, optional negative prompt, input/output media, model name
//! and tags.
//!
//! # Architecture
//!
//! - **Store**: asynchronous persistence behind the [`RecordStore`] trait
//!   (SQLite on disk, in-memory for tests)
//! - **Catalog**: filtering, search and JSON backup import/export over a
//!   snapshot of the collection
//! - **Vault**: application state tying the two together
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = Arc::new(SqliteStore::open(&config).await?);
//! let mut vault = Vault::load(store).await?;
//!
//! let mut record = PromptRecord::new(Category::General);
//! record.set_title("Summarizer");
//! record.set_prompt("Summarize the following text in three bullet points");
//! vault.create(record).await?;
//!
//! let matches = vault.query(Some(Category::General), "summar");
//! ```
//!
//! # Modules
//!
//! - `models`: `PromptRecord` and `Category`
//! - `store`: the `RecordStore` trait and usage accounting
//! - `storage`: store engines and their errors
//! - `catalog`: filter, search, export and import
//! - `vault`: application state
//! - `media`: embedding local media files as data URLs
//! - `refine`: optional remote prompt refinement
//! - `config`: application configuration

pub mod catalog;
pub mod config;
pub mod media;
pub mod models;
pub mod refine;
pub mod storage;
pub mod store;
pub mod vault;

pub use catalog::{CatalogError, ImportEntry, ImportReport, RejectReason};
pub use config::Config;
pub use models::{Category, PromptRecord, UnknownCategory, ValidationError};
pub use refine::{RefineOutcome, Refiner};
pub use storage::{MemoryStore, SqliteStore, StorageError, UnavailableStore};
pub use store::{RecordStore, StorageUsage};
pub use vault::{Backup, Vault, VaultError};
