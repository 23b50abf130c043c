//! Review domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A text review. Belongs to one place and one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub text: String,
    pub place_id: Uuid,
    pub user_id: Uuid,
}

impl Review {
    pub fn new(text: impl Into<String>, place_id: Uuid, user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            text: text.into(),
            place_id,
            user_id,
        }
    }
}
