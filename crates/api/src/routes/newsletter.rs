//! Newsletter subscription route handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use joestar_core::Email;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::models::SubscribeOutcome;
use crate::state::AppState;

/// Subscribe body.
#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Unsubscribe body.
#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    #[serde(default)]
    pub email: String,
}

/// Subscribe, or switch a lapsed subscription back on.
#[instrument(skip(state, body))]
pub async fn subscribe(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SubscribeRequest>,
) -> Result<impl IntoResponse> {
    let email = parse_email(&body.email)?;
    let name = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty());

    match state.store().subscribe(&email, name).await? {
        SubscribeOutcome::Created(subscriber) => {
            tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription created");
            Ok((
                StatusCode::CREATED,
                ApiJson(json!({
                    "message": "Successfully subscribed to newsletter",
                    "subscriber": subscriber,
                })),
            ))
        }
        SubscribeOutcome::Reactivated(subscriber) => {
            tracing::info!(subscriber_id = %subscriber.id, "Newsletter subscription reactivated");
            Ok((
                StatusCode::OK,
                ApiJson(json!({
                    "message": "Subscription reactivated",
                    "subscriber": subscriber,
                })),
            ))
        }
        SubscribeOutcome::AlreadyActive => {
            Err(AppError::Conflict("Email already subscribed".to_string()))
        }
    }
}

/// Deactivate a subscription.
#[instrument(skip(state, body))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<UnsubscribeRequest>,
) -> Result<impl IntoResponse> {
    let email = parse_email(&body.email)?;

    if !state.store().unsubscribe(&email).await? {
        return Err(AppError::NotFound(
            "Email not found in subscribers".to_string(),
        ));
    }

    tracing::info!("Newsletter subscription cancelled");
    Ok(ApiJson(json!({ "message": "Successfully unsubscribed" })))
}

fn parse_email(raw: &str) -> Result<Email> {
    if raw.trim().is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    Email::parse(raw).map_err(|_| AppError::Validation("Invalid email address".to_string()))
}
