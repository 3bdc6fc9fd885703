//! Storage layer
//!
//! Engines that implement [`RecordStore`](crate::store::RecordStore).
//!
//! - **SQLite**: the durable engine, one database file under `data_dir`
//! - **Memory**: throwaway collection for tests
//! - **Unavailable**: stands in when the durable engine cannot be opened

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod unavailable;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite::SqliteStore;
pub use unavailable::UnavailableStore;
