//! Contact form route handler.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use joestar_core::Email;

use crate::error::{AppError, Result};
use crate::extract::ApiJson;
use crate::models::NewContactMessage;
use crate::state::AppState;

/// Contact form data.
#[derive(Debug, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl TryFrom<ContactRequest> for NewContactMessage {
    type Error = AppError;

    fn try_from(form: ContactRequest) -> Result<Self> {
        let fields = [&form.name, &form.email, &form.subject, &form.message];
        if fields.iter().any(|f| f.trim().is_empty()) {
            return Err(AppError::Validation("All fields are required".to_string()));
        }

        let email = Email::parse(&form.email)
            .map_err(|_| AppError::Validation("Invalid email address".to_string()))?;

        Ok(Self {
            name: form.name.trim().to_string(),
            email,
            subject: form.subject.trim().to_string(),
            message: form.message.trim().to_string(),
        })
    }
}

/// Store a contact form message.
#[instrument(skip(state, form))]
pub async fn submit(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<ContactRequest>,
) -> Result<impl IntoResponse> {
    let message = NewContactMessage::try_from(form)?;
    let stored = state.store().create_contact_message(message).await?;
    tracing::info!(message_id = %stored.id, "Contact message received");

    Ok((
        StatusCode::CREATED,
        ApiJson(json!({
            "message": "Message sent successfully",
            "id": stored.id,
        })),
    ))
}
