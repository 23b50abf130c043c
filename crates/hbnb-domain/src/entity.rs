//! Polymorphic entity wrapper
//!
//! `Entity` carries any of the six record types behind one type. The
//! serialized form is the record's attribute map plus a `__class__`
//! discriminator, which is what the file backend writes to disk and
//! what reconstruction dispatches on.
//!
//! Entities deliberately implement no equality: two distinct in-memory
//! objects are never "equal", even with identical field values. Compare
//! ids, or serialized forms, explicitly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Amenity, City, Place, Review, State, User};

/// Globally unique entity identifier (UUID v4).
pub type EntityId = Uuid;

/// Any of the six record types, discriminated by `__class__`.
///
/// Unknown keys in a serialized attribute map are ignored on
/// reconstruction; they are never absorbed into the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "__class__")]
pub enum Entity {
    State(State),
    City(City),
    User(User),
    Place(Place),
    Review(Review),
    Amenity(Amenity),
}

/// The discriminator as a first-class value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    State,
    City,
    User,
    Place,
    Review,
    Amenity,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::State => "State",
            EntityKind::City => "City",
            EntityKind::User => "User",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
            EntityKind::Amenity => "Amenity",
        }
    }

    /// All six kinds, in declaration order.
    pub fn all() -> [EntityKind; 6] {
        [
            EntityKind::State,
            EntityKind::City,
            EntityKind::User,
            EntityKind::Place,
            EntityKind::Review,
            EntityKind::Amenity,
        ]
    }

    /// Whether records of `child` carry a foreign key pointing at an
    /// owner of this kind (the owned-collection pairs).
    pub fn owns(self, child: EntityKind) -> bool {
        matches!(
            (self, child),
            (EntityKind::State, EntityKind::City)
                | (EntityKind::City, EntityKind::Place)
                | (EntityKind::User, EntityKind::Place)
                | (EntityKind::Place, EntityKind::Review)
                | (EntityKind::User, EntityKind::Review)
        )
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an entity kind name.
#[derive(Debug, thiserror::Error)]
#[error("unknown entity kind: {0}")]
pub struct UnknownKind(pub String);

impl std::str::FromStr for EntityKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "State" => Ok(EntityKind::State),
            "City" => Ok(EntityKind::City),
            "User" => Ok(EntityKind::User),
            "Place" => Ok(EntityKind::Place),
            "Review" => Ok(EntityKind::Review),
            "Amenity" => Ok(EntityKind::Amenity),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

impl Entity {
    pub fn id(&self) -> EntityId {
        match self {
            Entity::State(e) => e.id,
            Entity::City(e) => e.id,
            Entity::User(e) => e.id,
            Entity::Place(e) => e.id,
            Entity::Review(e) => e.id,
            Entity::Amenity(e) => e.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::State(_) => EntityKind::State,
            Entity::City(_) => EntityKind::City,
            Entity::User(_) => EntityKind::User,
            Entity::Place(_) => EntityKind::Place,
            Entity::Review(_) => EntityKind::Review,
            Entity::Amenity(_) => EntityKind::Amenity,
        }
    }

    /// Storage key, `"<Kind>.<id>"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.kind(), self.id())
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Entity::State(e) => e.created_at,
            Entity::City(e) => e.created_at,
            Entity::User(e) => e.created_at,
            Entity::Place(e) => e.created_at,
            Entity::Review(e) => e.created_at,
            Entity::Amenity(e) => e.created_at,
        }
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        match self {
            Entity::State(e) => e.updated_at,
            Entity::City(e) => e.updated_at,
            Entity::User(e) => e.updated_at,
            Entity::Place(e) => e.updated_at,
            Entity::Review(e) => e.updated_at,
            Entity::Amenity(e) => e.updated_at,
        }
    }

    /// Refresh `updated_at`. Call before re-registering a mutated
    /// record so the persisted form carries the mutation time.
    pub fn touch(&mut self) {
        let now = Utc::now();
        match self {
            Entity::State(e) => e.updated_at = now,
            Entity::City(e) => e.updated_at = now,
            Entity::User(e) => e.updated_at = now,
            Entity::Place(e) => e.updated_at = now,
            Entity::Review(e) => e.updated_at = now,
            Entity::Amenity(e) => e.updated_at = now,
        }
    }

    /// The foreign key on this record that points at an owner of
    /// `owner_kind`, if the relation exists.
    pub fn foreign_key(&self, owner_kind: EntityKind) -> Option<EntityId> {
        match (self, owner_kind) {
            (Entity::City(c), EntityKind::State) => Some(c.state_id),
            (Entity::Place(p), EntityKind::City) => Some(p.city_id),
            (Entity::Place(p), EntityKind::User) => Some(p.user_id),
            (Entity::Review(r), EntityKind::Place) => Some(r.place_id),
            (Entity::Review(r), EntityKind::User) => Some(r.user_id),
            _ => None,
        }
    }
}

impl From<State> for Entity {
    fn from(e: State) -> Self {
        Entity::State(e)
    }
}

impl From<City> for Entity {
    fn from(e: City) -> Self {
        Entity::City(e)
    }
}

impl From<User> for Entity {
    fn from(e: User) -> Self {
        Entity::User(e)
    }
}

impl From<Place> for Entity {
    fn from(e: Place) -> Self {
        Entity::Place(e)
    }
}

impl From<Review> for Entity {
    fn from(e: Review) -> Self {
        Entity::Review(e)
    }
}

impl From<Amenity> for Entity {
    fn from(e: Amenity) -> Self {
        Entity::Amenity(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_entities() -> Vec<Entity> {
        let state = State::new("California");
        let city = City::new("San Jose", state.id);
        let user = User::new("ada@example.com", "hunter2", Some("Ada".into()), None);
        let mut place = Place::new("Loft", city.id, user.id);
        let amenity = Amenity::new("wifi");
        place.link_amenity(amenity.id);
        let review = Review::new("Great stay", place.id, user.id);
        vec![
            state.into(),
            city.into(),
            user.into(),
            place.into(),
            review.into(),
            amenity.into(),
        ]
    }

    #[test]
    fn serialized_form_round_trips_field_for_field() {
        for entity in sample_entities() {
            let first = serde_json::to_value(&entity).unwrap();
            let back: Entity = serde_json::from_value(first.clone()).unwrap();
            let second = serde_json::to_value(&back).unwrap();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn serialized_form_carries_discriminator_and_base_fields() {
        for entity in sample_entities() {
            let value = serde_json::to_value(&entity).unwrap();
            let map = value.as_object().unwrap();
            assert_eq!(
                map.get("__class__").and_then(|v| v.as_str()),
                Some(entity.kind().as_str())
            );
            assert!(map.contains_key("id"));
            // RFC 3339 text timestamps
            assert!(map["created_at"].as_str().unwrap().contains('T'));
            assert!(map["updated_at"].as_str().is_some());
        }
    }

    #[test]
    fn unknown_keys_are_ignored_not_absorbed() {
        let mut value = serde_json::to_value(Entity::from(Amenity::new("wifi"))).unwrap();
        value
            .as_object_mut()
            .unwrap()
            .insert("bogus".into(), serde_json::json!(42));
        let back: Entity = serde_json::from_value(value).unwrap();
        let reserialized = serde_json::to_value(&back).unwrap();
        assert!(reserialized.as_object().unwrap().get("bogus").is_none());
    }

    #[test]
    fn key_is_kind_dot_id() {
        let state = State::new("Nevada");
        let id = state.id;
        let entity = Entity::from(state);
        assert_eq!(entity.key(), format!("State.{}", id));
    }

    #[test]
    fn fresh_ids_are_pairwise_distinct() {
        let ids: HashSet<Uuid> = (0..100).map(|_| State::new("x").id).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn kind_parses_from_discriminator_text() {
        for kind in EntityKind::all() {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("BaseModel".parse::<EntityKind>().is_err());
    }

    #[test]
    fn foreign_keys_follow_ownership() {
        let state = State::new("California");
        let city = City::new("San Jose", state.id);
        let entity = Entity::from(city.clone());
        assert_eq!(entity.foreign_key(EntityKind::State), Some(state.id));
        assert_eq!(entity.foreign_key(EntityKind::User), None);

        assert!(EntityKind::State.owns(EntityKind::City));
        assert!(EntityKind::User.owns(EntityKind::Review));
        assert!(!EntityKind::State.owns(EntityKind::Place));
        assert!(!EntityKind::Amenity.owns(EntityKind::Place));
    }

    #[test]
    fn touch_refreshes_updated_at_only() {
        let mut entity = Entity::from(Amenity::new("pool"));
        let created = entity.created_at();
        let before = entity.updated_at();
        std::thread::sleep(std::time::Duration::from_millis(2));
        entity.touch();
        assert_eq!(entity.created_at(), created);
        assert!(entity.updated_at() > before);
    }
}
