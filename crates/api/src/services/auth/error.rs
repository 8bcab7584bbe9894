//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication and authorization.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format at registration.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] rigstore_core::EmailError),

    /// Full name is empty or whitespace.
    #[error("full name cannot be blank")]
    BlankName,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// No token was presented.
    #[error("authentication required")]
    Unauthenticated,

    /// Token failed signature, format, or expiry checks.
    #[error("invalid token")]
    InvalidToken,

    /// Valid identity without the required role.
    #[error("insufficient role")]
    Forbidden,

    /// Hashing did not finish within the configured bound.
    #[error("password hashing timed out")]
    HashTimeout,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token could not be signed.
    #[error("token signing error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
