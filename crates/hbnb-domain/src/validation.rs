//! Boundary validation for entities
//!
//! The storage engine stores whatever it is handed; required-field
//! checks happen here, at the boundary above it.

use serde::{Deserialize, Serialize};

use crate::Entity;

/// Severity of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationSeverity {
    Error,
    Warning,
}

/// A validation error or warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub severity: ValidationSeverity,
}

fn required(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("{} is required", field),
            severity: ValidationSeverity::Error,
        });
    }
}

/// Validate an entity before persisting it.
pub fn validate_entity(entity: &Entity) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    match entity {
        Entity::State(state) => required(&mut errors, "name", &state.name),
        Entity::City(city) => required(&mut errors, "name", &city.name),
        Entity::Amenity(amenity) => required(&mut errors, "name", &amenity.name),
        Entity::User(user) => {
            required(&mut errors, "email", &user.email);
            required(&mut errors, "password", &user.password);
        }
        Entity::Place(place) => {
            required(&mut errors, "name", &place.name);
            if place.latitude.is_some() != place.longitude.is_some() {
                errors.push(ValidationError {
                    field: "latitude".to_string(),
                    message: "latitude and longitude should be set together".to_string(),
                    severity: ValidationSeverity::Warning,
                });
            }
        }
        Entity::Review(review) => required(&mut errors, "text", &review.text),
    }

    errors
}

/// Check that an entity has no validation errors (warnings allowed).
pub fn is_valid(entity: &Entity) -> bool {
    validate_entity(entity)
        .iter()
        .all(|e| e.severity != ValidationSeverity::Error)
}
