//! Blog route handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::content::{BlogQuery, Post};
use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Deserialize)]
pub struct BlogListQuery {
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub limit: Option<usize>,
}

impl From<BlogListQuery> for BlogQuery {
    fn from(query: BlogListQuery) -> Self {
        Self {
            category: query.category.filter(|c| !c.trim().is_empty()),
            featured: query.featured,
            limit: query.limit,
        }
    }
}

/// Published posts, newest first.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<BlogListQuery>,
) -> Result<impl IntoResponse> {
    let posts: Vec<_> = state
        .blog()
        .list(&query.into())
        .into_iter()
        .map(Post::summary)
        .collect();

    Ok(ApiJson(json!({
        "total": posts.len(),
        "posts": posts,
    })))
}

/// A published post with its rendered body.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = state
        .blog()
        .get_post(&slug)
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(ApiJson(json!({ "post": post.detail() })))
}
