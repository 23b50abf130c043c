//! Backend selection
//!
//! One selector, read once at process start, chooses which backend the
//! process runs on. The engine is constructed exactly once and handed
//! to consumers; selection never happens per-call.

use std::env;
use std::path::PathBuf;

use crate::file_store::FileStore;
use crate::sqlite_store::SqliteStore;
use crate::store::{StorageEngine, StoreError};

/// Which backend to run on, with its durable-form location. The
/// relational engine is embedded SQLite, so its connection parameters
/// reduce to a database file path.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    File { path: PathBuf },
    Database { path: PathBuf },
}

impl StorageConfig {
    /// Read the selector from the environment: `HBNB_TYPE_STORAGE=db`
    /// selects the relational backend, anything else the file backend.
    /// `HBNB_DB_PATH` / `HBNB_FILE_PATH` override the default
    /// locations (`hbnb.db` / `file.json`).
    pub fn from_env() -> Self {
        if env::var("HBNB_TYPE_STORAGE").as_deref() == Ok("db") {
            StorageConfig::Database {
                path: env::var("HBNB_DB_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("hbnb.db")),
            }
        } else {
            StorageConfig::File {
                path: env::var("HBNB_FILE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("file.json")),
            }
        }
    }

    /// Construct the process's engine. File backend: populate from the
    /// durable document (missing file = empty store). Relational
    /// backend: open the database and ensure the schema.
    pub fn open(&self) -> Result<Box<dyn StorageEngine>, StoreError> {
        match self {
            StorageConfig::File { path } => Ok(Box::new(FileStore::open(path)?)),
            StorageConfig::Database { path } => Ok(Box::new(SqliteStore::open(path)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hbnb_domain::{EntityKind, State};
    use tempfile::TempDir;

    #[test]
    fn env_selector_picks_the_backend_once() {
        env::set_var("HBNB_TYPE_STORAGE", "db");
        env::set_var("HBNB_DB_PATH", "custom.db");
        assert!(matches!(
            StorageConfig::from_env(),
            StorageConfig::Database { path } if path == PathBuf::from("custom.db")
        ));

        env::remove_var("HBNB_TYPE_STORAGE");
        env::remove_var("HBNB_DB_PATH");
        assert!(matches!(
            StorageConfig::from_env(),
            StorageConfig::File { path } if path == PathBuf::from("file.json")
        ));
    }

    #[test]
    fn open_builds_a_working_engine_for_both_variants() {
        let dir = TempDir::new().unwrap();

        let configs = [
            StorageConfig::File {
                path: dir.path().join("file.json"),
            },
            StorageConfig::Database {
                path: dir.path().join("hbnb.db"),
            },
        ];
        for config in configs {
            let engine = config.open().unwrap();
            let state = State::new("California");
            let id = state.id;
            engine.register(state.into()).unwrap();
            engine.save().unwrap();
            assert!(engine.get(EntityKind::State, &id).unwrap().is_some());
            engine.close();
        }
    }
}
