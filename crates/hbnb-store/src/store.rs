use std::collections::BTreeMap;

use hbnb_domain::{Entity, EntityId, EntityKind, Place};

/// The trait that both storage backends implement.
///
/// Registered objects live in the backend's working set and become
/// durable only on `save`. `get` reports absence as `Ok(None)`, never
/// as an error. Registering a second object under an existing
/// `"<Kind>.<id>"` key overwrites the first (last write wins).
pub trait StorageEngine: Send + Sync {
    /// Every object in the working set, or only those of `kind`,
    /// keyed `"<Kind>.<id>"`. Ordering is unspecified.
    fn all(&self, kind: Option<EntityKind>) -> Result<BTreeMap<String, Entity>, StoreError>;

    /// Look up exactly one object. Absent is `Ok(None)`.
    fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, StoreError>;

    /// Number of objects, filtered by `kind` if given.
    fn count(&self, kind: Option<EntityKind>) -> Result<usize, StoreError>;

    /// Place a freshly constructed object into the working set.
    /// Not durable until `save`.
    fn register(&self, entity: Entity) -> Result<(), StoreError>;

    /// Flush pending state to durable form. Idempotent: saving twice
    /// with no intervening changes produces the same durable state.
    fn save(&self) -> Result<(), StoreError>;

    /// Remove an object from the working set and schedule its removal
    /// from durable form at the next `save`. Deleting an object that
    /// is not present is a no-op.
    fn delete(&self, entity: &Entity) -> Result<(), StoreError>;

    /// Repopulate the working set from durable form, discarding
    /// unsaved in-memory state. A missing durable form is an empty
    /// store, not a failure. No-op for the relational backend.
    fn reload(&self) -> Result<(), StoreError>;

    /// Release backend resources. Safe to call repeatedly.
    fn close(&self);

    /// Objects of `kind` owned by `owner` (State→City, City→Place,
    /// User→Place, Place→Review, User→Review). Asking for a pair with
    /// no foreign-key relation is `StoreError::NoSuchRelation`.
    fn owned_by(&self, owner: &Entity, kind: EntityKind) -> Result<Vec<Entity>, StoreError>;

    /// Amenities linked to a place. Ids with no matching amenity are
    /// skipped, not errors.
    fn amenities_of(&self, place: &Place) -> Result<Vec<Entity>, StoreError>;
}

/// Errors from the storage engines.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Durable-form I/O failure, parse failure on reload, or
    /// commit/rollback failure. Never swallowed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// `owned_by` was asked for a pair with no foreign-key relation.
    #[error("no foreign-key relation from {child} to {owner}")]
    NoSuchRelation {
        owner: EntityKind,
        child: EntityKind,
    },
}
