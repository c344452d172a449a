//! Wishlist route handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use joestar_core::wishlist::Wishlist;
use joestar_core::{ProductId, UserId};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::state::AppState;

/// Add-to-wishlist body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    #[serde(default)]
    pub product_id: String,
}

/// The caller's wishlist with product details.
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let wishlist = state.store().get_wishlist(auth.id).await?;
    respond(&state, auth.id, wishlist, None).await
}

/// Add a product.
#[instrument(skip(state, auth, body), fields(user_id = %auth.id, product_id = %body.product_id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    ApiJson(body): ApiJson<AddRequest>,
) -> Result<impl IntoResponse> {
    let product_id = body.product_id.trim();
    if product_id.is_empty() {
        return Err(AppError::Validation("Product ID is required".to_string()));
    }
    let product_id = ProductId::new(product_id);

    if state.store().get_product(&product_id).await?.is_none() {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    let wishlist = state
        .store()
        .add_to_wishlist(auth.id, &product_id)
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => {
                AppError::Conflict("Product already in wishlist".to_string())
            }
            other => other.into(),
        })?;

    respond(&state, auth.id, wishlist, Some("Added to wishlist")).await
}

/// Remove a product.
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    Path(product_id): Path<String>,
) -> Result<impl IntoResponse> {
    let wishlist = state
        .store()
        .remove_from_wishlist(auth.id, &ProductId::new(product_id))
        .await
        .map_err(|e| match e {
            RepositoryError::NotFound => {
                AppError::NotFound("Product not in wishlist".to_string())
            }
            other => other.into(),
        })?;

    respond(&state, auth.id, wishlist, Some("Removed from wishlist")).await
}

async fn respond(
    state: &AppState,
    user_id: UserId,
    wishlist: Wishlist,
    message: Option<&str>,
) -> Result<ApiJson<serde_json::Value>> {
    let products = state.store().get_products(wishlist.ids()).await?;
    tracing::debug!(user_id = %user_id, count = wishlist.len(), "Wishlist loaded");

    let mut body = json!({
        "wishlist": wishlist.ids(),
        "products": products,
    });
    if let (Some(message), Some(obj)) = (message, body.as_object_mut()) {
        obj.insert("message".to_string(), message.into());
    }
    Ok(ApiJson(body))
}
