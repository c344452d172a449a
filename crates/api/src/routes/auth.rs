//! Authentication route handlers.
//!
//! Registration and login return a bearer token; profile and password
//! routes require one.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::ApiJson;
use crate::middleware::RequireAuth;
use crate::models::{User, UserProfile, UserSummary};
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub referral_code: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update body. Omitted fields are left unchanged.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Password change body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub new_password: String,
}

/// Create an account.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let (user, profile) = AuthService::new(state.store())
        .register(Registration {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            referral_code: body.referral_code.as_deref(),
        })
        .await?;

    let token = issue_token(&state, &user)?;
    tracing::info!(user_id = %user.id, referred = user.referred_by.is_some(), "User registered");
    add_breadcrumb("auth", "User registered", None);

    Ok((
        StatusCode::CREATED,
        ApiJson(json!({
            "message": "User created successfully",
            "user": UserSummary::from(&user),
            "redeemCode": profile.redeem_code,
            "token": token,
        })),
    ))
}

/// Exchange email and password for a token.
#[instrument(skip(state, body), fields(email = %body.email))]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.store())
        .login(&body.email, &body.password)
        .await?;

    let token = issue_token(&state, &user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(ApiJson(json!({
        "message": "Login successful",
        "user": UserSummary::from(&user),
        "token": token,
    })))
}

/// Current user's profile.
#[instrument(skip(state, auth), fields(user_id = %auth.id))]
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.store()).get_user(auth.id).await?;
    Ok(ApiJson(json!({ "user": UserProfile::from(&user) })))
}

/// Update name and/or email.
#[instrument(skip(state, auth, body), fields(user_id = %auth.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    ApiJson(body): ApiJson<UpdateProfileRequest>,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.store())
        .update_profile(auth.id, body.name.as_deref(), body.email.as_deref())
        .await?;

    Ok(ApiJson(json!({
        "message": "Profile updated successfully",
        "user": UserSummary::from(&user),
    })))
}

/// Change the password after checking the current one.
#[instrument(skip(state, auth, body), fields(user_id = %auth.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(auth): RequireAuth,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    AuthService::new(state.store())
        .change_password(auth.id, &body.current_password, &body.new_password)
        .await?;

    tracing::info!("Password changed");
    Ok(ApiJson(json!({ "message": "Password changed successfully" })))
}

fn issue_token(state: &AppState, user: &User) -> Result<String> {
    state
        .tokens()
        .issue(user.id, &user.email, Utc::now())
        .map_err(|e| AppError::Internal(e.to_string()))
}
