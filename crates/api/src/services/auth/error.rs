//! Authentication error types.

use axum::http::StatusCode;
use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// The display strings of client-facing variants are sent as the response
/// message, so they are phrased for end users.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was missing or blank.
    #[error("{0}")]
    MissingFields(&'static str),

    /// Invalid email format.
    #[error("Invalid email address")]
    InvalidEmail(#[from] joestar_core::EmailError),

    /// Invalid credentials (wrong password or unknown email).
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// User not found.
    #[error("User not found")]
    UserNotFound,

    /// Registration email already taken.
    #[error("User with this email already exists")]
    UserAlreadyExists,

    /// Profile update email belongs to someone else.
    #[error("Email already in use")]
    EmailTaken,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Current password did not verify during a password change.
    #[error("Current password is incorrect")]
    IncorrectPassword,

    /// Referral code given at registration does not belong to any affiliate.
    #[error("Invalid referral code")]
    InvalidReferralCode,

    /// No redeem code could be assigned to the new account.
    #[error("Could not assign an affiliate code")]
    RedeemCodeUnavailable,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields(_)
            | Self::InvalidEmail(_)
            | Self::UserAlreadyExists
            | Self::EmailTaken
            | Self::WeakPassword(_)
            | Self::IncorrectPassword
            | Self::InvalidReferralCode => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Repository(_) | Self::PasswordHash | Self::RedeemCodeUnavailable => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a server-side failure.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Repository(_) | Self::PasswordHash | Self::RedeemCodeUnavailable
        )
    }
}
