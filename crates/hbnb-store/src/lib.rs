//! Storage engines for hbnb
//!
//! One capability contract (`StorageEngine`), two backends:
//! - `FileStore` - a JSON-document working set, whole-document saves
//! - `SqliteStore` - one table per entity type, transactional saves
//!
//! A process selects its backend once at startup via `StorageConfig`
//! and passes the engine handle to every consumer; there is no global
//! storage singleton.

pub mod config;
pub mod file_store;
pub mod sqlite_store;
pub mod store;

pub use config::StorageConfig;
pub use file_store::FileStore;
pub use sqlite_store::SqliteStore;
pub use store::{StorageEngine, StoreError};
