//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Errors render as JSON
//! `{"error": <code>, "message": <text>}`; server-side failures are captured to
//! Sentry and logged before responding, and their details never reach clients.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::revenue::RevenueError;

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication or authorization failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    #[error("Revenue error: {0}")]
    Revenue(#[from] RevenueError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How an error is presented to the client.
struct Presentation {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Presentation {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", message)
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal",
            "Internal server error",
        )
    }

    fn repository(err: &RepositoryError) -> Self {
        match err {
            RepositoryError::Database(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "Service temporarily unavailable",
            ),
            RepositoryError::DataCorruption(_) => Self::internal(),
            RepositoryError::NotFound => Self::not_found("Not found"),
            RepositoryError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "conflict", msg.clone()),
        }
    }

    fn auth(err: &AuthError) -> Self {
        match err {
            AuthError::InvalidEmail(_) => Self::invalid_input("Invalid email address"),
            AuthError::BlankName | AuthError::WeakPassword(_) => Self::invalid_input(err.to_string()),
            AuthError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid_credentials", "Invalid credentials")
            }
            AuthError::UserAlreadyExists => Self::new(
                StatusCode::CONFLICT,
                "conflict",
                "An account with this email already exists",
            ),
            AuthError::Unauthenticated => Self::new(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "Authentication required",
            ),
            AuthError::InvalidToken => {
                Self::new(StatusCode::UNAUTHORIZED, "invalid_token", "Invalid token")
            }
            AuthError::Forbidden => {
                Self::new(StatusCode::FORBIDDEN, "forbidden", "Insufficient permissions")
            }
            AuthError::HashTimeout => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                "Service temporarily unavailable",
            ),
            AuthError::PasswordHash | AuthError::Token(_) => Self::internal(),
            AuthError::Repository(e) => Self::repository(e),
        }
    }

    fn catalog(err: &CatalogError) -> Self {
        match err {
            CatalogError::NotFound => Self::not_found("Product not found"),
            CatalogError::InvalidProduct(_) | CatalogError::InvalidRating(_) => {
                Self::invalid_input(err.to_string())
            }
            CatalogError::Repository(e) => Self::repository(e),
        }
    }

    fn order(err: &OrderError) -> Self {
        match err {
            OrderError::EmptyOrder
            | OrderError::InvalidQuantity(_)
            | OrderError::InvalidStatus(_)
            | OrderError::TotalOverflow
            | OrderError::TransitionRefused { .. } => Self::invalid_input(err.to_string()),
            OrderError::ProductNotFound(_) | OrderError::OrderNotFound => {
                Self::not_found(err.to_string())
            }
            OrderError::InsufficientStock { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "insufficient_stock",
                err.to_string(),
            ),
            OrderError::Repository(e) => Self::repository(e),
        }
    }

    fn revenue(err: &RevenueError) -> Self {
        match err {
            RevenueError::Overflow(_) => Self::invalid_input(err.to_string()),
            RevenueError::Repository(e) => Self::repository(e),
        }
    }
}

impl AppError {
    fn presentation(&self) -> Presentation {
        match self {
            Self::Database(e) => Presentation::repository(e),
            Self::Auth(e) => Presentation::auth(e),
            Self::Catalog(e) => Presentation::catalog(e),
            Self::Order(e) => Presentation::order(e),
            Self::Revenue(e) => Presentation::revenue(e),
            Self::NotFound(msg) => Presentation::not_found(msg.clone()),
            Self::BadRequest(msg) => Presentation::invalid_input(msg.clone()),
            Self::Internal(_) => Presentation::internal(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let presentation = self.presentation();

        // Capture server errors to Sentry
        if presentation.status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        (
            presentation.status,
            Json(json!({
                "error": presentation.code,
                "message": presentation.message,
            })),
        )
            .into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated caller.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}
