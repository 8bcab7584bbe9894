//! Reporting handlers.

use axum::{Json, extract::State};
use serde::Deserialize;

use rigstore_core::OrderStatus;

use crate::error::{AppError, Result};
use crate::middleware::RequireAdmin;
use crate::models::CategoryRevenue;
use crate::routes::ApiQuery;
use crate::services::revenue::revenue_by_category;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RevenueParams {
    /// Order status to report on. Defaults to `Delivered`.
    pub status: Option<String>,
}

pub async fn revenue(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    ApiQuery(params): ApiQuery<RevenueParams>,
) -> Result<Json<Vec<CategoryRevenue>>> {
    let status = match params.status.as_deref() {
        None | Some("") => OrderStatus::Delivered,
        Some(s) => s
            .parse::<OrderStatus>()
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
    };

    let rows = revenue_by_category(state.store().as_ref(), status).await?;
    Ok(Json(rows))
}
