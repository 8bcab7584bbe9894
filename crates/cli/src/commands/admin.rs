//! Admin account management commands.
//!
//! # Usage
//!
//! ```bash
//! # Promote a registered customer (recommended)
//! rig-cli admin promote -e ada@example.com
//!
//! # Create an admin account directly
//! rig-cli admin create -e ops@example.com -n "Ops" -p 'correct horse battery'
//! ```
//!
//! There is no HTTP route that grants the admin role; these commands are the
//! only way to create one.

use std::time::Duration;

use thiserror::Error;

use rigstore_api::db::{IdentityStore, PgStore, RepositoryError};
use rigstore_api::models::NewUser;
use rigstore_api::services::auth::{AuthError, password};
use rigstore_core::{Email, EmailError, Role, UserId};

use super::{ConnectError, connect};

/// Hashing runs once per command, so this can be generous.
const HASH_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("Invalid name: name cannot be blank")]
    BlankName,

    /// Password rejected or hashing failed.
    #[error("Password error: {0}")]
    Password(#[from] AuthError),

    /// No account with this email.
    #[error("No user found with email: {0}")]
    UnknownUser(String),

    /// User already exists.
    #[error("User already exists with email: {0}")]
    UserExists(String),
}

/// Give an existing account the admin role.
///
/// # Returns
///
/// The ID of the promoted user.
pub async fn promote(email: &str) -> Result<UserId, AdminError> {
    let email = Email::parse(email)?;
    let store = PgStore::new(connect().await?);

    let user = store
        .set_role(&email, Role::Admin)
        .await?
        .ok_or_else(|| AdminError::UnknownUser(email.to_string()))?;

    tracing::info!("User promoted! ID: {}, Email: {}", user.id, user.email);
    Ok(user.id)
}

/// Create a new admin account.
///
/// # Arguments
///
/// * `email` - Login email address
/// * `name` - Display name
/// * `password` - Initial password, subject to the same rules as registration
///
/// # Returns
///
/// The ID of the created user.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let email = Email::parse(email)?;
    let full_name = name.trim();
    if full_name.is_empty() {
        return Err(AdminError::BlankName);
    }
    password::validate_password(password)?;

    let store = PgStore::new(connect().await?);

    tracing::info!("Creating admin user: {}", email);
    let password_hash = password::hash_password(password, HASH_TIMEOUT).await?;

    let user = store
        .create_user(NewUser {
            full_name: full_name.to_owned(),
            email: email.clone(),
            password_hash,
            role: Role::Admin,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Repository(other),
        })?;

    tracing::info!(
        "Admin user created successfully! ID: {}, Email: {}",
        user.id,
        user.email
    );
    Ok(user.id)
}
