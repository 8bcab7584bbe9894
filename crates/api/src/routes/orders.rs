//! Order handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use rigstore_core::{OrderId, OrderStatus};

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Order, OrderView};
use crate::routes::{ApiJson, ApiPath};
use crate::services::orders::OrderRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub success: bool,
    pub id: OrderId,
    pub status: OrderStatus,
}

pub async fn place(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiJson(body): ApiJson<OrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    let order = state.orders().place_order(&caller, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn index(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders().list_all().await?))
}

pub async fn mine(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(state.orders().list_mine(&caller).await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<OrderId>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> Result<Json<StatusResponse>> {
    let status = state.orders().update_status(id, &body.status).await?;
    Ok(Json(StatusResponse {
        success: true,
        id,
        status,
    }))
}
