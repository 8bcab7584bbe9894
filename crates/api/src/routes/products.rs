//! Catalog handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use rigstore_core::{ProductId, SortDirection};

use crate::error::Result;
use crate::middleware::{RequireAdmin, RequireAuth};
use crate::models::{Product, Review};
use crate::routes::{ApiJson, ApiPath, ApiQuery};
use crate::services::catalog::ProductDraft;
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Exact category filter.
    pub cat: Option<String>,
    /// Alias for `cat`.
    pub category: Option<String>,
    #[serde(default)]
    pub sort: SortDirection,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: i64,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
    pub review: Review,
}

pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Json<Vec<Product>>> {
    let category = params.cat.or(params.category);
    let products = state
        .catalog()
        .list(category.as_deref(), params.sort)
        .await?;
    Ok(Json(products))
}

pub async fn show(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiJson(draft): ApiJson<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let product = state.catalog().create(draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn delete(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiPath(id): ApiPath<ProductId>,
) -> Result<Json<Value>> {
    state.catalog().delete(id).await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn review(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    ApiPath(id): ApiPath<ProductId>,
    ApiJson(body): ApiJson<ReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>)> {
    let review = state
        .catalog()
        .append_review(id, &caller, body.rating, body.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ReviewResponse {
            success: true,
            review,
        }),
    ))
}
