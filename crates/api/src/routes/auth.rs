//! Registration, login, and token introspection.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::User;
use crate::routes::ApiJson;
use crate::services::auth::{AuthContext, Session};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub user: User,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self {
            token: session.token,
            user: session.user,
        }
    }
}

/// Handle registration.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>)> {
    let session = state
        .auth()
        .register(&body.full_name, &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Handle login.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<Json<SessionResponse>> {
    let session = state.auth().login(&body.email, &body.password).await?;
    tracing::info!(user_id = %session.user.id, "login succeeded");
    Ok(Json(session.into()))
}

/// Return the identity carried by the presented token.
pub async fn me(RequireAuth(caller): RequireAuth) -> Json<AuthContext> {
    Json(caller)
}
