//! User domain model
//!
//! The constructor digests plaintext passwords before they are stored;
//! a `User` never holds (or serializes) a plaintext password. Rebuilding
//! a user from its serialized form restores the stored digest verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An account. Owns many places and many reviews.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub email: String,
    /// One-way hex digest of the password, never the plaintext.
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    /// Create a new user. `password` is the plaintext and is digested
    /// here; the plaintext is not retained.
    pub fn new(
        email: impl Into<String>,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            email: email.into(),
            password: hash_password(password),
            first_name,
            last_name,
        }
    }
}

/// One-way, deterministic password digest (hex).
pub fn hash_password(plaintext: &str) -> String {
    blake3::hash(plaintext.as_bytes()).to_hex().to_string()
}
