//! Product route handlers.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use joestar_core::ProductId;
use joestar_core::catalog::{ProductQuery, ProductSort};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::state::AppState;

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub featured: Option<bool>,
    pub sort: Option<String>,
}

impl TryFrom<ListingQuery> for ProductQuery {
    type Error = AppError;

    fn try_from(query: ListingQuery) -> Result<Self> {
        let sort = match query.sort.as_deref().map(str::trim) {
            None | Some("") => ProductSort::default(),
            Some(raw) => raw.parse().map_err(AppError::Validation)?,
        };

        Ok(Self {
            category: query.category.filter(|c| !c.trim().is_empty()),
            search: query.search.filter(|s| !s.trim().is_empty()),
            featured: query.featured,
            sort,
        })
    }
}

/// Filtered, sorted product listing.
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListingQuery>,
) -> Result<impl IntoResponse> {
    let query = ProductQuery::try_from(query)?;
    let products = state.store().list_products(&query).await?;

    Ok(ApiJson(json!({
        "total": products.len(),
        "products": products,
    })))
}

/// A single product.
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let product = state
        .store()
        .get_product(&ProductId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;

    Ok(ApiJson(json!({ "product": product })))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_query_conversion() {
        let query = ProductQuery::try_from(ListingQuery {
            category: Some("Recovery".to_string()),
            search: Some("  ".to_string()),
            featured: Some(true),
            sort: Some("price-low".to_string()),
        })
        .unwrap();
        assert_eq!(query.category.as_deref(), Some("Recovery"));
        assert_eq!(query.search, None);
        assert_eq!(query.featured, Some(true));
        assert_eq!(query.sort, ProductSort::PriceAsc);

        assert_eq!(
            ProductQuery::try_from(ListingQuery::default()).unwrap().sort,
            ProductSort::Newest
        );
        assert!(matches!(
            ProductQuery::try_from(ListingQuery {
                sort: Some("cheapest".to_string()),
                ..ListingQuery::default()
            }),
            Err(AppError::Validation(_))
        ));
    }
}
