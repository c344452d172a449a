//! Order route handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use tracing::instrument;

use crate::error::Result;
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::services::OrderService;
use crate::services::orders::OrderRequest;
use crate::state::AppState;

/// Place an order.
#[instrument(skip(state, auth, body), fields(user_id = %auth.id, items = body.items.len()))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    ApiJson(body): ApiJson<OrderRequest>,
) -> Result<impl IntoResponse> {
    let placed = OrderService::new(state.store())
        .place_order(auth.id, body, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        ApiJson(json!({
            "message": "Order placed successfully",
            "order": placed.order,
            "affiliateCredited": placed.referral.is_some(),
        })),
    ))
}

/// The caller's most recent orders.
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let orders = OrderService::new(state.store()).history(auth.id).await?;
    Ok(ApiJson(json!({ "orders": orders })))
}
