//! Affiliate route handlers.

use axum::{extract::State, response::IntoResponse};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use joestar_core::affiliate::{AffiliateProfile, Referral, TierProgress};

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::services::AffiliateService;
use crate::state::AppState;

/// Dashboard response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardResponse {
    affiliate: AffiliateProfile,
    next_tier: Option<TierProgress>,
    total_referrals: usize,
    referrals: Vec<Referral>,
}

/// Referral tracking body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackRequest {
    #[serde(default)]
    pub affiliate_code: String,
    #[serde(default)]
    pub order_amount: Option<Decimal>,
}

/// Affiliate standing and referral history for the caller.
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let dashboard = AffiliateService::new(state.store())
        .dashboard(auth.id)
        .await?;

    Ok(ApiJson(DashboardResponse {
        total_referrals: dashboard.referrals.len(),
        affiliate: dashboard.profile,
        next_tier: dashboard.next_tier,
        referrals: dashboard.referrals,
    }))
}

/// The caller's redeem code, creating the profile if it is missing.
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn generate_code(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let profile = AffiliateService::new(state.store())
        .generate_code(auth.id)
        .await?;

    Ok(ApiJson(json!({
        "message": "Affiliate code ready",
        "redeemCode": profile.redeem_code,
        "affiliate": profile,
    })))
}

/// Credit an affiliate for an order amount.
///
/// Works without a token; a logged-in caller is recorded as the referred
/// user and cannot credit their own code.
#[instrument(skip(state, auth, body), fields(code = %body.affiliate_code))]
pub async fn track(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    ApiJson(body): ApiJson<TrackRequest>,
) -> Result<impl IntoResponse> {
    let amount = body.order_amount.ok_or_else(|| {
        AppError::Validation("Affiliate code and order amount are required".to_string())
    })?;

    let credited = AffiliateService::new(state.store())
        .track(
            &body.affiliate_code,
            amount,
            auth.map(|user| user.id),
            Utc::now(),
        )
        .await?;

    Ok(ApiJson(json!({
        "message": "Referral tracked successfully",
        "commission": credited.credit.commission,
        "tier": credited.credit.tier,
        "tierUpgraded": credited.credit.upgraded(),
        "referral": credited.referral,
    })))
}
