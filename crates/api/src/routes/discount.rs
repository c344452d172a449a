//! Discount code route handlers.

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use joestar_core::DiscountKind;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::services::DiscountService;
use crate::services::discounts::QuotedDiscount;
use crate::state::AppState;

/// Validate/apply request body.
#[derive(Debug, Deserialize)]
pub struct DiscountRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
}

/// Quote response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DiscountResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    code: String,
    #[serde(rename = "type")]
    kind: DiscountKind,
    discount: Decimal,
    original_amount: Decimal,
    discount_amount: Decimal,
    final_amount: Decimal,
}

impl DiscountResponse {
    fn new(quoted: QuotedDiscount, message: Option<&'static str>) -> Self {
        Self {
            valid: true,
            message,
            code: quoted.code.code,
            kind: quoted.code.kind,
            discount: quoted.code.discount,
            original_amount: quoted.quote.original_amount,
            discount_amount: quoted.quote.discount_amount,
            final_amount: quoted.quote.final_amount,
        }
    }
}

/// Check a code against an amount without using it up.
#[instrument(skip(state, body), fields(code = %body.code))]
pub async fn validate(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DiscountRequest>,
) -> Result<impl IntoResponse> {
    let amount = require_amount(body.amount)?;
    let quoted = DiscountService::new(state.store())
        .validate(&body.code, amount, Utc::now())
        .await?;

    Ok(ApiJson(DiscountResponse::new(quoted, None)))
}

/// Check a code and consume one use.
#[instrument(skip(state, body), fields(code = %body.code))]
pub async fn apply(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<DiscountRequest>,
) -> Result<impl IntoResponse> {
    let amount = require_amount(body.amount)?;
    let quoted = DiscountService::new(state.store())
        .apply(&body.code, amount, Utc::now())
        .await?;

    Ok(ApiJson(DiscountResponse::new(
        quoted,
        Some("Discount applied successfully"),
    )))
}

fn require_amount(amount: Option<Decimal>) -> Result<Decimal> {
    amount.ok_or_else(|| AppError::Validation("Code and amount are required".to_string()))
}
