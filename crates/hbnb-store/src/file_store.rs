//! File-backed storage engine
//!
//! The durable form is a single JSON document mapping `"<Kind>.<id>"`
//! to that object's attribute map (with its `__class__` discriminator).
//! Saves serialize the whole working set and replace the document via
//! write-then-rename, so a partial write never leaves a truncated
//! document behind; the old image stays readable until the new one is
//! fully written.
//!
//! Concurrent processes racing on `save`/`reload` can lose updates.
//! That is a known weakness of this backend, not something it guards
//! against.

use std::collections::{BTreeMap, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use hbnb_domain::{Entity, EntityId, EntityKind, Place};

use crate::store::{StorageEngine, StoreError};

/// JSON-document implementation of the StorageEngine trait.
pub struct FileStore {
    path: PathBuf,
    objects: Mutex<HashMap<String, Entity>>,
}

impl FileStore {
    /// Create a store over `path` with an empty working set. The file
    /// is not touched until `save`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Create a store over `path` and populate the working set from
    /// it. A missing file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(path);
        store.reload()?;
        Ok(store)
    }

    /// Path of the durable document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Entity>>, StoreError> {
        self.objects
            .lock()
            .map_err(|e| StoreError::Persistence(format!("lock: {}", e)))
    }

    fn storage_key(kind: EntityKind, id: &EntityId) -> String {
        format!("{}.{}", kind, id)
    }
}

impl StorageEngine for FileStore {
    fn all(&self, kind: Option<EntityKind>) -> Result<BTreeMap<String, Entity>, StoreError> {
        let objects = self.lock()?;
        let map = objects
            .iter()
            .filter(|(_, e)| kind.map_or(true, |k| e.kind() == k))
            .map(|(k, e)| (k.clone(), e.clone()))
            .collect();
        Ok(map)
    }

    fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, StoreError> {
        let objects = self.lock()?;
        Ok(objects.get(&Self::storage_key(kind, id)).cloned())
    }

    fn count(&self, kind: Option<EntityKind>) -> Result<usize, StoreError> {
        let objects = self.lock()?;
        Ok(match kind {
            None => objects.len(),
            Some(k) => objects.values().filter(|e| e.kind() == k).count(),
        })
    }

    fn register(&self, entity: Entity) -> Result<(), StoreError> {
        let mut objects = self.lock()?;
        // Last write wins on a colliding key.
        objects.insert(entity.key(), entity);
        Ok(())
    }

    fn save(&self) -> Result<(), StoreError> {
        let objects = self.lock()?;
        let json = serde_json::to_string_pretty(&*objects)
            .map_err(|e| StoreError::Persistence(format!("serialize: {}", e)))?;

        // Write-then-rename keeps the previous image valid until the
        // new one is complete.
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, json)
            .map_err(|e| StoreError::Persistence(format!("write {}: {}", tmp.display(), e)))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            StoreError::Persistence(format!("rename into {}: {}", self.path.display(), e))
        })?;

        debug!(count = objects.len(), path = %self.path.display(), "saved");
        Ok(())
    }

    fn delete(&self, entity: &Entity) -> Result<(), StoreError> {
        let mut objects = self.lock()?;
        // No-op when absent. No cascade: deleting a State leaves its
        // Cities in the working set; callers cascade explicitly if
        // they need it.
        objects.remove(&entity.key());
        Ok(())
    }

    fn reload(&self) -> Result<(), StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let mut objects = self.lock()?;
                objects.clear();
                return Ok(());
            }
            Err(e) => {
                return Err(StoreError::Persistence(format!(
                    "read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let loaded: HashMap<String, Entity> = serde_json::from_str(&text).map_err(|e| {
            StoreError::Persistence(format!("parse {}: {}", self.path.display(), e))
        })?;

        let mut objects = self.lock()?;
        *objects = loaded;
        debug!(count = objects.len(), path = %self.path.display(), "reloaded");
        Ok(())
    }

    /// Placeholder: this backend holds no open resources.
    fn close(&self) {}

    fn owned_by(&self, owner: &Entity, kind: EntityKind) -> Result<Vec<Entity>, StoreError> {
        if !owner.kind().owns(kind) {
            return Err(StoreError::NoSuchRelation {
                owner: owner.kind(),
                child: kind,
            });
        }
        // Resolution by scan: a linear pass over the working set,
        // filtering on the matching foreign key. O(n) per access.
        let owner_id = owner.id();
        let objects = self.lock()?;
        let matches = objects
            .values()
            .filter(|e| e.kind() == kind && e.foreign_key(owner.kind()) == Some(owner_id))
            .cloned()
            .collect();
        Ok(matches)
    }

    fn amenities_of(&self, place: &Place) -> Result<Vec<Entity>, StoreError> {
        let objects = self.lock()?;
        let amenities = place
            .amenity_ids
            .iter()
            .filter_map(|id| {
                objects
                    .get(&Self::storage_key(EntityKind::Amenity, id))
                    .cloned()
            })
            .collect();
        Ok(amenities)
    }
}
