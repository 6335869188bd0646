//! Storage backends (`SQLite` + flat key-value blobs)

pub mod backend;
pub mod db;
pub mod flat;
pub mod kv;
pub mod migrations;
pub mod sqlite;

pub use backend::{BackendKind, CascadeOutcome, StorageBackend, StorageInfo};
pub use db::Database;
pub use flat::{FlatBackend, DEFAULT_FLAT_QUOTA};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
pub use sqlite::SqliteBackend;
