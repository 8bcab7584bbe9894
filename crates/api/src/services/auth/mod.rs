//! Authentication service.
//!
//! Provides password registration and login, session token issuance, and
//! role checks on the identity a token carries.

mod error;
pub mod password;
mod token;

pub use error::AuthError;
pub use token::{Claims, TokenKeys};

use std::time::Duration;

use serde::Serialize;

use rigstore_core::{Email, Role, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{NewUser, User};

use password::{hash_password, validate_password, verify_password};

/// Well-formed hash with default Argon2 parameters, verified in place of a
/// missing account's hash so unknown emails cost the same as wrong passwords.
const DUMMY_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$Y0ea1poJCyWCd+yPum+ZQQ$ptUd4Rjx/PFtrgJ4G5SXmRpdTGyhLrh+qjgxFYd0QWs";

/// Identity and role attached to a request after its token is verified.
///
/// Passed explicitly to every operation that needs it; there is no ambient
/// session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub user_id: UserId,
    pub role: Role,
    pub display_name: String,
}

impl AuthContext {
    /// Check that the caller holds `required`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Forbidden` when an admin-only operation is called
    /// with a customer identity.
    pub const fn require_role(&self, required: Role) -> Result<(), AuthError> {
        match (required, self.role) {
            (Role::Admin, Role::Customer) => Err(AuthError::Forbidden),
            _ => Ok(()),
        }
    }
}

impl From<&User> for AuthContext {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role: user.role,
            display_name: user.full_name.clone(),
        }
    }
}

/// A freshly authenticated account and its token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Authentication service.
///
/// Handles user registration, login, and token issuance over any storage
/// backend.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    tokens: &'a TokenKeys,
    hash_timeout: Duration,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, tokens: &'a TokenKeys, hash_timeout: Duration) -> Self {
        Self {
            store,
            tokens,
            hash_timeout,
        }
    }

    /// Register a new customer account and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::BlankName`, `AuthError::InvalidEmail`, or
    /// `AuthError::WeakPassword` for bad input, and
    /// `AuthError::UserAlreadyExists` if the email is already registered.
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::BlankName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let password_hash = hash_password(password, self.hash_timeout).await?;

        let user = self
            .store
            .create_user(NewUser {
                full_name: full_name.to_owned(),
                email,
                password_hash,
                role: Role::Customer,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "account registered");
        let token = self.issue_token(&user)?;
        Ok(Session { user, token })
    }

    /// Login with email and password.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let Some((user, password_hash)) = self.store.get_credentials(&email).await? else {
            verify_password(password, DUMMY_HASH, self.hash_timeout).await?;
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash, self.hash_timeout).await?;

        let token = self.issue_token(&user)?;
        Ok(Session { user, token })
    }

    /// Sign a token embedding the account's id, role, and display name.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue_token(&self, user: &User) -> Result<String, AuthError> {
        self.tokens.issue(&AuthContext::from(user))
    }

    /// Verify a presented token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` or `AuthError::InvalidToken`.
    pub fn authorize(&self, token: Option<&str>) -> Result<AuthContext, AuthError> {
        self.tokens.verify(token)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::db::{IdentityStore, MemoryStore};

    const LIMIT: Duration = Duration::from_secs(60);

    fn keys() -> TokenKeys {
        TokenKeys::new(
            &SecretString::from("k9$Lq2!vX7#pR4@mZ8&wT1^nB6*eH3%j".to_owned()),
            None,
        )
    }

    #[tokio::test]
    async fn test_register_issues_customer_token() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys, LIMIT);

        let session = auth
            .register("Ada Lovelace", "ada@example.com", "analytical")
            .await
            .unwrap();
        let ctx = auth.authorize(Some(&session.token)).unwrap();

        assert_eq!(ctx.user_id, session.user.id);
        assert_eq!(ctx.role, Role::Customer);
        assert_eq!(ctx.display_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_register_duplicate_email() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys, LIMIT);

        auth.register("Ada", "ada@example.com", "analytical")
            .await
            .unwrap();
        let err = auth
            .register("Imposter", "ada@example.com", "different1")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys, LIMIT);

        assert!(matches!(
            auth.register("  ", "a@b.c", "longenough").await,
            Err(AuthError::BlankName)
        ));
        assert!(matches!(
            auth.register("Ada", "nope", "longenough").await,
            Err(AuthError::InvalidEmail(_))
        ));
        assert!(matches!(
            auth.register("Ada", "a@b.c", "short").await,
            Err(AuthError::WeakPassword(_))
        ));
    }

    #[tokio::test]
    async fn test_login_does_not_enumerate() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys, LIMIT);
        auth.register("Ada", "ada@example.com", "analytical")
            .await
            .unwrap();

        let wrong_password = auth.login("ada@example.com", "incorrect").await.unwrap_err();
        let unknown_user = auth.login("bob@example.com", "analytical").await.unwrap_err();
        let garbage_email = auth.login("not-an-email", "analytical").await.unwrap_err();

        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert!(matches!(garbage_email, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_login_unknown_email_still_verifies_a_hash() {
        assert!(argon2::PasswordHash::new(DUMMY_HASH).is_ok());

        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys, Duration::ZERO);

        assert!(matches!(
            auth.login("bob@example.com", "analytical").await,
            Err(AuthError::HashTimeout)
        ));
    }

    #[tokio::test]
    async fn test_login_reflects_current_role() {
        let store = MemoryStore::new();
        let keys = keys();
        let auth = AuthService::new(&store, &keys, LIMIT);
        let session = auth
            .register("Ada", "ada@example.com", "analytical")
            .await
            .unwrap();

        store
            .set_role(&session.user.email, Role::Admin)
            .await
            .unwrap();
        let again = auth.login("ada@example.com", "analytical").await.unwrap();
        let ctx = auth.authorize(Some(&again.token)).unwrap();

        assert_eq!(ctx.user_id, session.user.id);
        assert_eq!(ctx.role, Role::Admin);
    }

    #[test]
    fn test_require_role() {
        let customer = AuthContext {
            user_id: UserId::new(1),
            role: Role::Customer,
            display_name: "c".to_owned(),
        };
        let admin = AuthContext {
            role: Role::Admin,
            ..customer.clone()
        };

        assert!(customer.require_role(Role::Customer).is_ok());
        assert!(matches!(
            customer.require_role(Role::Admin),
            Err(AuthError::Forbidden)
        ));
        assert!(admin.require_role(Role::Admin).is_ok());
        assert!(admin.require_role(Role::Customer).is_ok());
    }
}
