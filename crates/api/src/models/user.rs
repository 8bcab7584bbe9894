//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rigstore_core::{Email, Role, UserId};

/// A registered account.
///
/// The password hash is never part of this type; it is only read back
/// alongside the user during login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name, also used as the author name on reviews.
    pub full_name: String,
    /// Login key.
    pub email: Email,
    /// Authorization tier.
    pub role: Role,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: Email,
    /// PHC-formatted Argon2 hash.
    pub password_hash: String,
    pub role: Role,
}
