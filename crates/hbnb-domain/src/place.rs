//! Place domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A rentable property. Belongs to one city and one user, owns many
/// reviews, and links to amenities many-to-many.
///
/// `amenity_ids` is the serialized form of the amenity association.
/// The relational backend rebuilds it from the join table on read so
/// that both backends return equivalent places.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    pub description: Option<String>,
    pub number_rooms: i64,
    pub number_bathrooms: i64,
    pub max_guest: i64,
    pub price_by_night: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub city_id: Uuid,
    pub user_id: Uuid,
    #[serde(default)]
    pub amenity_ids: Vec<Uuid>,
}

impl Place {
    /// Create a new place in the given city, owned by the given user.
    /// Numeric fields start at zero; coordinates and description unset.
    pub fn new(name: impl Into<String>, city_id: Uuid, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            name: name.into(),
            description: None,
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: None,
            longitude: None,
            city_id,
            user_id,
            amenity_ids: Vec::new(),
        }
    }

    /// Link an amenity to this place. Idempotent.
    pub fn link_amenity(&mut self, amenity_id: Uuid) {
        if !self.amenity_ids.contains(&amenity_id) {
            self.amenity_ids.push(amenity_id);
        }
    }

    /// Unlink an amenity. Unlinking an amenity that was never linked
    /// is a no-op.
    pub fn unlink_amenity(&mut self, amenity_id: Uuid) {
        self.amenity_ids.retain(|id| *id != amenity_id);
    }
}
