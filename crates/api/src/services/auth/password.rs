//! Argon2id hashing, off the async runtime and bounded in time.

use std::time::Duration;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

use super::AuthError;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Run a CPU-heavy closure on the blocking pool, giving up after `limit`.
async fn bounded<T, F>(limit: Duration, f: F) -> Result<T, AuthError>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::time::timeout(limit, task::spawn_blocking(f)).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join)) => {
            tracing::error!(error = %join, "password hashing task failed");
            Err(AuthError::PasswordHash)
        }
        Err(_) => {
            tracing::warn!(limit_ms = limit.as_millis(), "password hashing timed out");
            Err(AuthError::HashTimeout)
        }
    }
}

/// Hash a password using Argon2id with a fresh random salt.
///
/// # Errors
///
/// Returns `AuthError::HashTimeout` if hashing exceeds `limit`, or
/// `AuthError::PasswordHash` if Argon2 fails.
pub async fn hash_password(password: &str, limit: Duration) -> Result<String, AuthError> {
    let password = password.to_owned();
    bounded(limit, move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|_| AuthError::PasswordHash)
    })
    .await?
}

/// Verify a password against a PHC hash string.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` on mismatch or an unparseable hash,
/// and `AuthError::HashTimeout` if verification exceeds `limit`.
pub async fn verify_password(password: &str, hash: &str, limit: Duration) -> Result<(), AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    bounded(limit, move || {
        let parsed_hash = PasswordHash::new(&hash).map_err(|_| AuthError::InvalidCredentials)?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AuthError::InvalidCredentials)
    })
    .await?
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const LIMIT: Duration = Duration::from_secs(60);

    #[test]
    fn test_validate_password_length() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("longenough").is_ok());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hash = hash_password("correct horse", LIMIT).await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert_ne!(hash, "correct horse");
        verify_password("correct horse", &hash, LIMIT).await.unwrap();
        assert!(matches!(
            verify_password("wrong horse", &hash, LIMIT).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_salts_differ() {
        let a = hash_password("same password", LIMIT).await.unwrap();
        let b = hash_password("same password", LIMIT).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string", LIMIT).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_zero_limit_times_out() {
        assert!(matches!(
            hash_password("some password", Duration::ZERO).await,
            Err(AuthError::HashTimeout)
        ));
    }
}
