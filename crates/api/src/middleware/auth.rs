//! Authentication extractors.
//!
//! The token is read from the `x-auth-token` header, or from
//! `Authorization: Bearer <token>` when that header is absent.

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
};

use rigstore_core::Role;

use crate::error::{AppError, set_sentry_user};
use crate::services::auth::AuthContext;
use crate::state::AppState;

/// Header carrying the session token.
pub const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Extractor that requires a valid token of any role.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(caller): RequireAuth) -> impl IntoResponse {
///     format!("Hello, {}!", caller.display_name)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthContext);

/// Extractor that requires a valid admin token.
///
/// Customers get `403 Forbidden`, not `401`.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthContext);

/// Pull the presented token, if any, out of the request headers.
fn presented_token(headers: &HeaderMap) -> Option<&str> {
    if let Some(value) = headers.get(AUTH_TOKEN_HEADER) {
        return Some(value.to_str().unwrap_or_default());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
}

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let caller = state.tokens().verify(presented_token(&parts.headers))?;
        set_sentry_user(&caller.user_id);
        tracing::Span::current().record("user_id", tracing::field::display(caller.user_id));
        Ok(Self(caller))
    }
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(caller) = RequireAuth::from_request_parts(parts, state).await?;
        caller.require_role(Role::Admin)?;
        Ok(Self(caller))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_custom_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTH_TOKEN_HEADER, HeaderValue::from_static("abc"));
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(presented_token(&headers), Some("abc"));
    }

    #[test]
    fn test_bearer_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(presented_token(&headers), Some("xyz"));
    }

    #[test]
    fn test_no_token() {
        assert_eq!(presented_token(&HeaderMap::new()), None);
    }
}
