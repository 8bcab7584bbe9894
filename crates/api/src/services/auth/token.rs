//! Signed session tokens (HS256 JWT).
//!
//! A token carries the account id, role, and display name. Expiry is
//! optional: without a configured TTL tokens carry no `exp` claim.

use std::collections::HashSet;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use rigstore_core::Role;

use super::{AuthContext, AuthError};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account id.
    pub sub: String,
    pub role: Role,
    /// Display name, used as the author of reviews.
    pub name: String,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

/// Signing and verification keys plus issuance policy.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Option<Duration>,
}

impl TokenKeys {
    /// Build keys from the shared HMAC secret.
    #[must_use]
    pub fn new(secret: &SecretString, ttl: Option<Duration>) -> Self {
        let bytes = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims = HashSet::new();
        validation.leeway = 0;
        validation.validate_exp = true;

        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation,
            ttl,
        }
    }

    /// Sign a token for `context`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Token` if signing fails.
    pub fn issue(&self, context: &AuthContext) -> Result<String, AuthError> {
        let iat = Utc::now().timestamp();
        let exp = self
            .ttl
            .map(|ttl| iat.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)));

        let claims = Claims {
            sub: context.user_id.to_string(),
            role: context.role,
            name: context.display_name.clone(),
            iat,
            exp,
        };

        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding,
        )?)
    }

    /// Verify a presented token and recover the caller's identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unauthenticated` when no token (or a blank one) was
    /// presented, and `AuthError::InvalidToken` for any signature, format, or
    /// expiry failure.
    pub fn verify(&self, token: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })?;

        let user_id = data
            .claims
            .sub
            .parse()
            .map_err(|_| AuthError::InvalidToken)?;

        Ok(AuthContext {
            user_id,
            role: data.claims.role,
            display_name: data.claims.name,
        })
    }
}
