//! Testimonial route handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::middleware::OptionalAuth;
use crate::models::NewTestimonial;
use crate::models::engagement::DEFAULT_LOCATION;
use crate::state::AppState;

/// Testimonial submission body.
#[derive(Debug, Deserialize)]
pub struct TestimonialRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub product: String,
}

impl TestimonialRequest {
    /// Validate and attach the submitter. Logged-in submissions are verified.
    fn into_new(self, user_id: Option<joestar_core::UserId>) -> Result<NewTestimonial> {
        let name = self.name.trim();
        let text = self.text.trim();
        let product = self.product.trim();
        let Some(rating) = self.rating else {
            return Err(required());
        };
        if name.is_empty() || text.is_empty() || product.is_empty() {
            return Err(required());
        }
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }

        let location = self
            .location
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());

        Ok(NewTestimonial {
            user_id,
            name: name.to_string(),
            location,
            rating,
            text: text.to_string(),
            product: product.to_string(),
            verified: user_id.is_some(),
        })
    }
}

fn required() -> AppError {
    AppError::Validation("Name, rating, text and product are required".to_string())
}

/// All testimonials, newest first.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let testimonials = state.store().list_testimonials().await?;
    Ok(ApiJson(json!({ "testimonials": testimonials })))
}

/// Submit a testimonial.
#[instrument(skip(state, auth, body))]
pub async fn create(
    State(state): State<AppState>,
    OptionalAuth(auth): OptionalAuth,
    ApiJson(body): ApiJson<TestimonialRequest>,
) -> Result<impl IntoResponse> {
    let testimonial = body.into_new(auth.map(|user| user.id))?;
    let testimonial = state.store().create_testimonial(testimonial).await?;
    tracing::info!(
        testimonial_id = %testimonial.id,
        verified = testimonial.verified,
        "Testimonial submitted"
    );

    Ok((
        StatusCode::CREATED,
        ApiJson(json!({
            "message": "Testimonial submitted successfully",
            "testimonial": testimonial,
        })),
    ))
}
