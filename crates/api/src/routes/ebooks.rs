//! E-book route handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use joestar_core::EbookId;

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct EbookQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
}

/// E-books matching the filters, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<EbookQuery>,
) -> Result<impl IntoResponse> {
    let category = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
    let ebooks = state.store().list_ebooks(category, query.featured).await?;
    Ok(ApiJson(json!({ "ebooks": ebooks })))
}

/// A single e-book.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let ebook = state
        .store()
        .get_ebook(&EbookId::new(id))
        .await?
        .ok_or_else(not_found)?;
    Ok(ApiJson(json!({ "ebook": ebook })))
}

/// Count a download and return the download URL.
#[instrument(skip(state))]
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let ebook = state
        .store()
        .record_download(&EbookId::new(id))
        .await?
        .ok_or_else(not_found)?;
    tracing::info!(ebook_id = %ebook.id, downloads = ebook.downloads, "E-book downloaded");

    Ok(ApiJson(json!({
        "message": "Download started",
        "downloadUrl": ebook.download_url,
        "downloads": ebook.downloads,
    })))
}

fn not_found() -> AppError {
    AppError::NotFound("E-book not found".to_string())
}
