//! Domain types shared between the hbnb storage backends
//!
//! This crate provides the canonical record types for the listing service:
//! - State: a top-level region that owns cities
//! - City: a region belonging to one state, owning places
//! - User: an account that owns places and reviews
//! - Place: a rentable property belonging to a city and a user
//! - Review: a text review of a place by a user
//! - Amenity: a feature linked to places (many-to-many)
//!
//! All records share identity (`id`) and timestamp bookkeeping
//! (`created_at`/`updated_at`); the `Entity` enum carries any of them
//! with a `__class__` discriminator in the serialized form.

pub mod amenity;
pub mod city;
pub mod entity;
pub mod place;
pub mod review;
pub mod state;
pub mod user;
pub mod validation;

pub use amenity::*;
pub use city::*;
pub use entity::*;
pub use place::*;
pub use review::*;
pub use state::*;
pub use user::*;
pub use validation::*;
