//! Relational storage engine
//!
//! One table per entity type, keyed by `id`, with foreign-key columns
//! for every owned relationship and a `place_amenity` join table for
//! the Place–Amenity many-to-many. Owned collections cascade at the
//! schema level: deleting a State deletes its Cities, and transitively
//! everything those Cities own.
//!
//! `register`/`delete` stage row writes inside an open transaction;
//! `save` commits it. Foreign keys are deferred to commit, so a save
//! that would break referential integrity fails, rolls back, and
//! leaves the previous durable state intact.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, warn};
use uuid::Uuid;

use hbnb_domain::{Amenity, City, Entity, EntityId, EntityKind, Place, Review, State, User};

use crate::store::{StorageEngine, StoreError};

/// SQLite-backed implementation of the StorageEngine trait.
pub struct SqliteStore {
    inner: Mutex<Inner>,
}

struct Inner {
    conn: Connection,
    in_tx: bool,
}

impl SqliteStore {
    /// Open (or create) a database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Persistence(format!("open {}: {}", path.display(), e)))?;
        Self::init_with_connection(conn)
    }

    /// Create an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Persistence(format!("open_in_memory: {}", e)))?;
        Self::init_with_connection(conn)
    }

    fn init_with_connection(conn: Connection) -> Result<Self, StoreError> {
        Self::init_schema(&conn)?;
        Ok(Self {
            inner: Mutex::new(Inner { conn, in_tx: false }),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS states (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS cities (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                name TEXT NOT NULL,
                state_id TEXT NOT NULL REFERENCES states(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
            );

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                email TEXT NOT NULL,
                password TEXT NOT NULL,
                first_name TEXT,
                last_name TEXT
            );

            CREATE TABLE IF NOT EXISTS places (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                number_rooms INTEGER NOT NULL,
                number_bathrooms INTEGER NOT NULL,
                max_guest INTEGER NOT NULL,
                price_by_night INTEGER NOT NULL,
                latitude REAL,
                longitude REAL,
                city_id TEXT NOT NULL REFERENCES cities(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
                user_id TEXT NOT NULL REFERENCES users(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
            );

            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                text TEXT NOT NULL,
                place_id TEXT NOT NULL REFERENCES places(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
                user_id TEXT NOT NULL REFERENCES users(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED
            );

            CREATE TABLE IF NOT EXISTS amenities (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS place_amenity (
                place_id TEXT NOT NULL REFERENCES places(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
                amenity_id TEXT NOT NULL REFERENCES amenities(id)
                    ON DELETE CASCADE DEFERRABLE INITIALLY DEFERRED,
                PRIMARY KEY (place_id, amenity_id)
            );
            ",
        )
        .map_err(|e| StoreError::Persistence(format!("init_schema: {}", e)))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|e| StoreError::Persistence(format!("lock: {}", e)))
    }
}

impl Inner {
    /// Open the session transaction lazily on the first staged write.
    fn begin_if_needed(&mut self) -> Result<(), StoreError> {
        if !self.in_tx {
            self.conn
                .execute_batch("BEGIN")
                .map_err(|e| StoreError::Persistence(format!("begin: {}", e)))?;
            self.in_tx = true;
        }
        Ok(())
    }

    fn upsert(&self, entity: &Entity) -> Result<(), StoreError> {
        match entity {
            Entity::State(s) => {
                self.conn
                    .execute(
                        "INSERT INTO states (id, created_at, updated_at, name)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(id) DO UPDATE SET
                             created_at = excluded.created_at,
                             updated_at = excluded.updated_at,
                             name = excluded.name",
                        params![
                            s.id.to_string(),
                            s.created_at.to_rfc3339(),
                            s.updated_at.to_rfc3339(),
                            s.name,
                        ],
                    )
                    .map_err(|e| StoreError::Persistence(format!("upsert state: {}", e)))?;
            }
            Entity::City(c) => {
                self.conn
                    .execute(
                        "INSERT INTO cities (id, created_at, updated_at, name, state_id)
                         VALUES (?1, ?2, ?3, ?4, ?5)
                         ON CONFLICT(id) DO UPDATE SET
                             created_at = excluded.created_at,
                             updated_at = excluded.updated_at,
                             name = excluded.name,
                             state_id = excluded.state_id",
                        params![
                            c.id.to_string(),
                            c.created_at.to_rfc3339(),
                            c.updated_at.to_rfc3339(),
                            c.name,
                            c.state_id.to_string(),
                        ],
                    )
                    .map_err(|e| StoreError::Persistence(format!("upsert city: {}", e)))?;
            }
            Entity::User(u) => {
                self.conn
                    .execute(
                        "INSERT INTO users (id, created_at, updated_at, email, password,
                                            first_name, last_name)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                         ON CONFLICT(id) DO UPDATE SET
                             created_at = excluded.created_at,
                             updated_at = excluded.updated_at,
                             email = excluded.email,
                             password = excluded.password,
                             first_name = excluded.first_name,
                             last_name = excluded.last_name",
                        params![
                            u.id.to_string(),
                            u.created_at.to_rfc3339(),
                            u.updated_at.to_rfc3339(),
                            u.email,
                            u.password,
                            u.first_name,
                            u.last_name,
                        ],
                    )
                    .map_err(|e| StoreError::Persistence(format!("upsert user: {}", e)))?;
            }
            Entity::Place(p) => {
                self.conn
                    .execute(
                        "INSERT INTO places (id, created_at, updated_at, name, description,
                                             number_rooms, number_bathrooms, max_guest,
                                             price_by_night, latitude, longitude,
                                             city_id, user_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                         ON CONFLICT(id) DO UPDATE SET
                             created_at = excluded.created_at,
                             updated_at = excluded.updated_at,
                             name = excluded.name,
                             description = excluded.description,
                             number_rooms = excluded.number_rooms,
                             number_bathrooms = excluded.number_bathrooms,
                             max_guest = excluded.max_guest,
                             price_by_night = excluded.price_by_night,
                             latitude = excluded.latitude,
                             longitude = excluded.longitude,
                             city_id = excluded.city_id,
                             user_id = excluded.user_id",
                        params![
                            p.id.to_string(),
                            p.created_at.to_rfc3339(),
                            p.updated_at.to_rfc3339(),
                            p.name,
                            p.description,
                            p.number_rooms,
                            p.number_bathrooms,
                            p.max_guest,
                            p.price_by_night,
                            p.latitude,
                            p.longitude,
                            p.city_id.to_string(),
                            p.user_id.to_string(),
                        ],
                    )
                    .map_err(|e| StoreError::Persistence(format!("upsert place: {}", e)))?;

                // Replace the join rows from the id list.
                let place_id = p.id.to_string();
                self.conn
                    .execute(
                        "DELETE FROM place_amenity WHERE place_id = ?1",
                        params![place_id],
                    )
                    .map_err(|e| StoreError::Persistence(format!("clear amenities: {}", e)))?;
                for amenity_id in &p.amenity_ids {
                    self.conn
                        .execute(
                            "INSERT OR IGNORE INTO place_amenity (place_id, amenity_id)
                             VALUES (?1, ?2)",
                            params![place_id, amenity_id.to_string()],
                        )
                        .map_err(|e| StoreError::Persistence(format!("link amenity: {}", e)))?;
                }
            }
            Entity::Review(r) => {
                self.conn
                    .execute(
                        "INSERT INTO reviews (id, created_at, updated_at, text, place_id, user_id)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                         ON CONFLICT(id) DO UPDATE SET
                             created_at = excluded.created_at,
                             updated_at = excluded.updated_at,
                             text = excluded.text,
                             place_id = excluded.place_id,
                             user_id = excluded.user_id",
                        params![
                            r.id.to_string(),
                            r.created_at.to_rfc3339(),
                            r.updated_at.to_rfc3339(),
                            r.text,
                            r.place_id.to_string(),
                            r.user_id.to_string(),
                        ],
                    )
                    .map_err(|e| StoreError::Persistence(format!("upsert review: {}", e)))?;
            }
            Entity::Amenity(a) => {
                self.conn
                    .execute(
                        "INSERT INTO amenities (id, created_at, updated_at, name)
                         VALUES (?1, ?2, ?3, ?4)
                         ON CONFLICT(id) DO UPDATE SET
                             created_at = excluded.created_at,
                             updated_at = excluded.updated_at,
                             name = excluded.name",
                        params![
                            a.id.to_string(),
                            a.created_at.to_rfc3339(),
                            a.updated_at.to_rfc3339(),
                            a.name,
                        ],
                    )
                    .map_err(|e| StoreError::Persistence(format!("upsert amenity: {}", e)))?;
            }
        }
        Ok(())
    }
}

fn table_of(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::State => "states",
        EntityKind::City => "cities",
        EntityKind::User => "users",
        EntityKind::Place => "places",
        EntityKind::Review => "reviews",
        EntityKind::Amenity => "amenities",
    }
}

fn columns_of(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::State | EntityKind::Amenity => "id, created_at, updated_at, name",
        EntityKind::City => "id, created_at, updated_at, name, state_id",
        EntityKind::User => {
            "id, created_at, updated_at, email, password, first_name, last_name"
        }
        EntityKind::Place => {
            "id, created_at, updated_at, name, description, number_rooms, number_bathrooms, \
             max_guest, price_by_night, latitude, longitude, city_id, user_id"
        }
        EntityKind::Review => "id, created_at, updated_at, text, place_id, user_id",
    }
}

/// Foreign-key column on the child table for an owned collection.
fn fk_column(owner: EntityKind, child: EntityKind) -> Option<&'static str> {
    match (owner, child) {
        (EntityKind::State, EntityKind::City) => Some("state_id"),
        (EntityKind::City, EntityKind::Place) => Some("city_id"),
        (EntityKind::User, EntityKind::Place) => Some("user_id"),
        (EntityKind::Place, EntityKind::Review) => Some("place_id"),
        (EntityKind::User, EntityKind::Review) => Some("user_id"),
        _ => None,
    }
}

fn col<T: rusqlite::types::FromSql>(
    row: &rusqlite::Row<'_>,
    idx: usize,
    name: &str,
) -> Result<T, StoreError> {
    row.get(idx)
        .map_err(|e| StoreError::Persistence(format!("column {}: {}", name, e)))
}

fn parse_id(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Persistence(format!("parse id {}: {}", s, e)))
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Persistence(format!("parse timestamp {}: {}", s, e)))
}

fn load_amenity_ids(conn: &Connection, place_id: &str) -> Result<Vec<Uuid>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT amenity_id FROM place_amenity WHERE place_id = ?1")
        .map_err(|e| StoreError::Persistence(format!("prepare amenity ids: {}", e)))?;
    let raw = stmt
        .query_map(params![place_id], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError::Persistence(format!("query amenity ids: {}", e)))?
        .collect::<Result<Vec<String>, _>>()
        .map_err(|e| StoreError::Persistence(format!("collect amenity ids: {}", e)))?;
    raw.iter().map(|s| parse_id(s)).collect()
}

/// Rebuild an entity from a row selected with `columns_of(kind)`.
fn row_to_entity(
    conn: &Connection,
    kind: EntityKind,
    row: &rusqlite::Row<'_>,
) -> Result<Entity, StoreError> {
    let id_str: String = col(row, 0, "id")?;
    let id = parse_id(&id_str)?;
    let created_at = parse_ts(&col::<String>(row, 1, "created_at")?)?;
    let updated_at = parse_ts(&col::<String>(row, 2, "updated_at")?)?;

    let entity = match kind {
        EntityKind::State => Entity::State(State {
            id,
            created_at,
            updated_at,
            name: col(row, 3, "name")?,
        }),
        EntityKind::City => Entity::City(City {
            id,
            created_at,
            updated_at,
            name: col(row, 3, "name")?,
            state_id: parse_id(&col::<String>(row, 4, "state_id")?)?,
        }),
        EntityKind::User => Entity::User(User {
            id,
            created_at,
            updated_at,
            email: col(row, 3, "email")?,
            password: col(row, 4, "password")?,
            first_name: col(row, 5, "first_name")?,
            last_name: col(row, 6, "last_name")?,
        }),
        EntityKind::Place => Entity::Place(Place {
            id,
            created_at,
            updated_at,
            name: col(row, 3, "name")?,
            description: col(row, 4, "description")?,
            number_rooms: col(row, 5, "number_rooms")?,
            number_bathrooms: col(row, 6, "number_bathrooms")?,
            max_guest: col(row, 7, "max_guest")?,
            price_by_night: col(row, 8, "price_by_night")?,
            latitude: col(row, 9, "latitude")?,
            longitude: col(row, 10, "longitude")?,
            city_id: parse_id(&col::<String>(row, 11, "city_id")?)?,
            user_id: parse_id(&col::<String>(row, 12, "user_id")?)?,
            amenity_ids: load_amenity_ids(conn, &id_str)?,
        }),
        EntityKind::Review => Entity::Review(Review {
            id,
            created_at,
            updated_at,
            text: col(row, 3, "text")?,
            place_id: parse_id(&col::<String>(row, 4, "place_id")?)?,
            user_id: parse_id(&col::<String>(row, 5, "user_id")?)?,
        }),
        EntityKind::Amenity => Entity::Amenity(Amenity {
            id,
            created_at,
            updated_at,
            name: col(row, 3, "name")?,
        }),
    };
    Ok(entity)
}

impl StorageEngine for SqliteStore {
    fn all(&self, kind: Option<EntityKind>) -> Result<BTreeMap<String, Entity>, StoreError> {
        let inner = self.lock()?;
        let kinds: Vec<EntityKind> = match kind {
            Some(k) => vec![k],
            None => EntityKind::all().to_vec(),
        };

        let mut map = BTreeMap::new();
        for k in kinds {
            let sql = format!("SELECT {} FROM {}", columns_of(k), table_of(k));
            let mut stmt = inner
                .conn
                .prepare(&sql)
                .map_err(|e| StoreError::Persistence(format!("prepare all: {}", e)))?;
            let rows = stmt
                .query_map([], |row| Ok(row_to_entity(&inner.conn, k, row)))
                .map_err(|e| StoreError::Persistence(format!("query all: {}", e)))?;
            for row_result in rows {
                let entity =
                    row_result.map_err(|e| StoreError::Persistence(format!("row: {}", e)))??;
                map.insert(entity.key(), entity);
            }
        }
        Ok(map)
    }

    fn get(&self, kind: EntityKind, id: &EntityId) -> Result<Option<Entity>, StoreError> {
        let inner = self.lock()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?1",
            columns_of(kind),
            table_of(kind)
        );
        let mut stmt = inner
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Persistence(format!("prepare get: {}", e)))?;
        let found = stmt
            .query_row(params![id.to_string()], |row| {
                Ok(row_to_entity(&inner.conn, kind, row))
            })
            .optional()
            .map_err(|e| StoreError::Persistence(format!("query get: {}", e)))?;
        match found {
            Some(Ok(entity)) => Ok(Some(entity)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    fn count(&self, kind: Option<EntityKind>) -> Result<usize, StoreError> {
        let inner = self.lock()?;
        let kinds: Vec<EntityKind> = match kind {
            Some(k) => vec![k],
            None => EntityKind::all().to_vec(),
        };
        let mut total: i64 = 0;
        for k in kinds {
            let sql = format!("SELECT COUNT(*) FROM {}", table_of(k));
            let n: i64 = inner
                .conn
                .query_row(&sql, [], |row| row.get(0))
                .map_err(|e| StoreError::Persistence(format!("count: {}", e)))?;
            total += n;
        }
        Ok(total as usize)
    }

    fn register(&self, entity: Entity) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.begin_if_needed()?;
        inner.upsert(&entity)
    }

    fn save(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if !inner.in_tx {
            return Ok(());
        }
        inner.in_tx = false;
        match inner.conn.execute_batch("COMMIT") {
            Ok(()) => {
                debug!("committed");
                Ok(())
            }
            Err(commit_err) => {
                if let Err(rollback_err) = inner.conn.execute_batch("ROLLBACK") {
                    warn!(error = %rollback_err, "rollback after failed commit also failed");
                }
                Err(StoreError::Persistence(format!("commit: {}", commit_err)))
            }
        }
    }

    fn delete(&self, entity: &Entity) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.begin_if_needed()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", table_of(entity.kind()));
        // Zero affected rows means the object was not present: no-op.
        inner
            .conn
            .execute(&sql, params![entity.id().to_string()])
            .map_err(|e| StoreError::Persistence(format!("delete: {}", e)))?;
        Ok(())
    }

    /// No separate reload step: reads always come from the engine.
    fn reload(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn close(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            if inner.in_tx {
                inner.in_tx = false;
                if let Err(e) = inner.conn.execute_batch("ROLLBACK") {
                    warn!(error = %e, "rollback on close failed");
                }
            }
        }
    }

    fn owned_by(&self, owner: &Entity, kind: EntityKind) -> Result<Vec<Entity>, StoreError> {
        let fk = fk_column(owner.kind(), kind).ok_or(StoreError::NoSuchRelation {
            owner: owner.kind(),
            child: kind,
        })?;
        let inner = self.lock()?;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ?1",
            columns_of(kind),
            table_of(kind),
            fk
        );
        let mut stmt = inner
            .conn
            .prepare(&sql)
            .map_err(|e| StoreError::Persistence(format!("prepare owned_by: {}", e)))?;
        let rows = stmt
            .query_map(params![owner.id().to_string()], |row| {
                Ok(row_to_entity(&inner.conn, kind, row))
            })
            .map_err(|e| StoreError::Persistence(format!("query owned_by: {}", e)))?;
        let mut matches = Vec::new();
        for row_result in rows {
            matches.push(row_result.map_err(|e| StoreError::Persistence(format!("row: {}", e)))??);
        }
        Ok(matches)
    }

    fn amenities_of(&self, place: &Place) -> Result<Vec<Entity>, StoreError> {
        let inner = self.lock()?;
        let mut stmt = inner
            .conn
            .prepare(
                "SELECT a.id, a.created_at, a.updated_at, a.name
                 FROM amenities a
                 JOIN place_amenity pa ON pa.amenity_id = a.id
                 WHERE pa.place_id = ?1",
            )
            .map_err(|e| StoreError::Persistence(format!("prepare amenities_of: {}", e)))?;
        let rows = stmt
            .query_map(params![place.id.to_string()], |row| {
                Ok(row_to_entity(&inner.conn, EntityKind::Amenity, row))
            })
            .map_err(|e| StoreError::Persistence(format!("query amenities_of: {}", e)))?;
        let mut amenities = Vec::new();
        for row_result in rows {
            amenities
                .push(row_result.map_err(|e| StoreError::Persistence(format!("row: {}", e)))??);
        }
        Ok(amenities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn seed_place(store: &SqliteStore) -> (User, State, City, Place) {
        let user = User::new("host@example.com", "hunter2", None, None);
        let state = State::new("California");
        let city = City::new("San Jose", state.id);
        let place = Place::new("Loft", city.id, user.id);
        store.register(user.clone().into()).unwrap();
        store.register(state.clone().into()).unwrap();
        store.register(city.clone().into()).unwrap();
        store.register(place.clone().into()).unwrap();
        (user, state, city, place)
    }

    #[test]
    fn register_and_get_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let state = State::new("California");
        store.register(state.clone().into()).unwrap();
        store.save().unwrap();

        let got = store.get(EntityKind::State, &state.id).unwrap().unwrap();
        assert_eq!(got.id(), state.id);
        assert_eq!(got.created_at(), state.created_at);
        assert_eq!(got.updated_at(), state.updated_at);
        match got {
            Entity::State(s) => assert_eq!(s.name, "California"),
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store
            .get(EntityKind::State, &Uuid::new_v4())
            .unwrap()
            .is_none());
    }

    #[test]
    fn staged_rows_are_visible_before_save() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.register(State::new("Nevada").into()).unwrap();
        assert_eq!(store.count(Some(EntityKind::State)).unwrap(), 1);
        assert_eq!(store.all(None).unwrap().len(), 1);
    }

    #[test]
    fn close_rolls_back_staged_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.register(State::new("Nevada").into()).unwrap();
        store.close();
        assert_eq!(store.count(None).unwrap(), 0);
        store.close();
    }

    #[test]
    fn save_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.register(State::new("Nevada").into()).unwrap();
        store.save().unwrap();
        store.save().unwrap();
        assert_eq!(store.count(None).unwrap(), 1);
    }

    #[test]
    fn saved_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hbnb.db");
        let state = State::new("California");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.register(state.clone().into()).unwrap();
            store.save().unwrap();
            store.close();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get(EntityKind::State, &state.id).unwrap().is_some());
    }

    #[test]
    fn commit_failure_rolls_back_and_surfaces() {
        let store = SqliteStore::open_in_memory().unwrap();
        // A city without its state breaks the deferred foreign key at
        // commit time.
        let city = City::new("Nowhere", Uuid::new_v4());
        store.register(city.into()).unwrap();
        let err = store.save().unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));

        // Previous durable state (empty) is intact and the store is
        // still usable.
        assert_eq!(store.count(None).unwrap(), 0);
        let state = State::new("California");
        store.register(state.clone().into()).unwrap();
        store
            .register(City::new("San Jose", state.id).into())
            .unwrap();
        store.save().unwrap();
        assert_eq!(store.count(None).unwrap(), 2);
    }

    #[test]
    fn delete_of_absent_object_is_noop() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.delete(&State::new("Ghost").into()).unwrap();
        store.save().unwrap();
    }

    #[test]
    fn deleting_a_state_cascades_to_cities() {
        let store = SqliteStore::open_in_memory().unwrap();
        let state = State::new("California");
        let city = City::new("San Jose", state.id);
        let state_entity: Entity = state.into();
        store.register(state_entity.clone()).unwrap();
        store.register(city.clone().into()).unwrap();
        store.save().unwrap();

        let got = store.get(EntityKind::City, &city.id).unwrap().unwrap();
        assert_eq!(got.foreign_key(EntityKind::State), Some(state_entity.id()));

        store.delete(&state_entity).unwrap();
        store.save().unwrap();
        store.reload().unwrap();
        assert!(store.get(EntityKind::City, &city.id).unwrap().is_none());
    }

    #[test]
    fn cascade_is_transitive_through_owned_chains() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (user, state, city, place) = seed_place(&store);
        let review = Review::new("Great stay", place.id, user.id);
        store.register(review.clone().into()).unwrap();
        store.save().unwrap();

        store.delete(&Entity::State(state)).unwrap();
        store.save().unwrap();

        assert!(store.get(EntityKind::City, &city.id).unwrap().is_none());
        assert!(store.get(EntityKind::Place, &place.id).unwrap().is_none());
        assert!(store.get(EntityKind::Review, &review.id).unwrap().is_none());
        // The user is not owned by the state chain and survives.
        assert!(store.get(EntityKind::User, &user.id).unwrap().is_some());
    }

    #[test]
    fn colliding_keys_last_write_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut state = State::new("Calif");
        store.register(state.clone().into()).unwrap();
        state.name = "California".into();
        store.register(state.clone().into()).unwrap();
        store.save().unwrap();

        assert_eq!(store.count(None).unwrap(), 1);
        match store.get(EntityKind::State, &state.id).unwrap().unwrap() {
            Entity::State(s) => assert_eq!(s.name, "California"),
            other => panic!("unexpected entity: {:?}", other),
        }
    }

    #[test]
    fn reregistering_a_place_keeps_its_reviews() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (user, _state, _city, mut place) = seed_place(&store);
        let review = Review::new("Great stay", place.id, user.id);
        store.register(review.clone().into()).unwrap();
        store.save().unwrap();

        place.description = Some("Sunny loft downtown".into());
        store.register(place.clone().into()).unwrap();
        store.save().unwrap();

        assert!(store.get(EntityKind::Review, &review.id).unwrap().is_some());
    }

    #[test]
    fn place_amenity_join_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        let (_user, _state, _city, mut place) = seed_place(&store);
        let wifi = Amenity::new("wifi");
        let pool = Amenity::new("pool");
        store.register(wifi.clone().into()).unwrap();
        store.register(pool.clone().into()).unwrap();
        place.link_amenity(wifi.id);
        place.link_amenity(pool.id);
        store.register(place.clone().into()).unwrap();
        store.save().unwrap();

        let got = store.get(EntityKind::Place, &place.id).unwrap().unwrap();
        let got_ids: HashSet<Uuid> = match got {
            Entity::Place(p) => p.amenity_ids.into_iter().collect(),
            other => panic!("unexpected entity: {:?}", other),
        };
        let want: HashSet<Uuid> = place.amenity_ids.iter().copied().collect();
        assert_eq!(got_ids, want);

        let amenities = store.amenities_of(&place).unwrap();
        assert_eq!(amenities.len(), 2);

        // Unlink one and re-register: the join follows the id list.
        place.unlink_amenity(pool.id);
        store.register(place.clone().into()).unwrap();
        store.save().unwrap();
        let amenities = store.amenities_of(&place).unwrap();
        assert_eq!(amenities.len(), 1);
        assert_eq!(amenities[0].id(), wifi.id);
    }

    #[test]
    fn owned_by_uses_foreign_keys() {
        let store = SqliteStore::open_in_memory().unwrap();
        let state = State::new("California");
        let other = State::new("Nevada");
        let state_entity: Entity = state.clone().into();
        store.register(state_entity.clone()).unwrap();
        store.register(other.clone().into()).unwrap();
        store
            .register(City::new("San Jose", state.id).into())
            .unwrap();
        store
            .register(City::new("Fresno", state.id).into())
            .unwrap();
        store.register(City::new("Reno", other.id).into()).unwrap();
        store.save().unwrap();

        let cities = store.owned_by(&state_entity, EntityKind::City).unwrap();
        assert_eq!(cities.len(), 2);

        let err = store
            .owned_by(&Amenity::new("wifi").into(), EntityKind::Place)
            .unwrap_err();
        assert!(matches!(err, StoreError::NoSuchRelation { .. }));
    }

    #[test]
    fn count_matches_all_after_mixed_operations() {
        let store = SqliteStore::open_in_memory().unwrap();
        let keep = State::new("California");
        let gone = State::new("Nevada");
        store.register(keep.into()).unwrap();
        store.register(gone.clone().into()).unwrap();
        store.register(Amenity::new("wifi").into()).unwrap();
        store.delete(&gone.into()).unwrap();
        store.save().unwrap();

        let all = store.all(None).unwrap();
        assert_eq!(store.count(None).unwrap(), all.len());
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn empty_store_is_empty() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert!(store.all(None).unwrap().is_empty());
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn empty_name_amenity_is_stored_without_complaint() {
        let store = SqliteStore::open_in_memory().unwrap();
        let amenity = Amenity::new("");
        let id = amenity.id;
        store.register(amenity.into()).unwrap();
        store.save().unwrap();
        assert!(store.get(EntityKind::Amenity, &id).unwrap().is_some());
    }
}
