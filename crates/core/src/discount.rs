//! Discount code evaluation.
//!
//! A [`DiscountCode`] is quoted against an order amount with
//! [`DiscountCode::quote`]. Quoting is pure: it never touches the usage
//! counter. Consuming a use is the store's job and must re-check the limit
//! atomically (see `record_discount_use` in the api crate).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{DiscountId, DiscountKind, percent_of, round_currency, within_amount_range};

/// Default usage limit for codes created without one.
pub const DEFAULT_MAX_USES: i32 = 999_999;

/// Reasons a discount code cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscountError {
    /// No active code matches.
    #[error("Invalid discount code")]
    NotFound,
    /// The code's validity window has passed.
    #[error("Discount code has expired")]
    Expired,
    /// The code has been used `max_uses` times.
    #[error("Discount code usage limit reached")]
    LimitExceeded,
    /// The order amount is negative or past the currency range.
    #[error("Amount must be a non-negative number")]
    InvalidAmount,
}

/// A redeemable discount code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCode {
    pub id: DiscountId,
    pub code: String,
    /// Percentage points for `Percentage`, an absolute amount for `Fixed`.
    pub discount: Decimal,
    #[serde(rename = "type")]
    pub kind: DiscountKind,
    #[serde(default = "default_max_uses")]
    pub max_uses: i32,
    #[serde(default)]
    pub used_count: i32,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub description: Option<String>,
}

const fn default_max_uses() -> i32 {
    DEFAULT_MAX_USES
}

const fn default_active() -> bool {
    true
}

/// Result of quoting a code against an order amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountQuote {
    pub original_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
}

impl DiscountCode {
    /// Case-insensitive exact match against a user-entered code.
    #[must_use]
    pub fn matches_code(&self, input: &str) -> bool {
        self.code.eq_ignore_ascii_case(input.trim())
    }

    /// Whether the code's validity window has passed at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.valid_until.is_some_and(|until| now > until)
    }

    /// Whether another use would exceed the usage limit.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.used_count >= self.max_uses
    }

    /// Check that the code is usable at `now`.
    ///
    /// Checks run in a fixed order: active, expiry, usage limit.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`DiscountError`].
    pub fn ensure_usable(&self, now: DateTime<Utc>) -> Result<(), DiscountError> {
        if !self.active {
            return Err(DiscountError::NotFound);
        }
        if self.is_expired(now) {
            return Err(DiscountError::Expired);
        }
        if self.is_exhausted() {
            return Err(DiscountError::LimitExceeded);
        }
        Ok(())
    }

    /// Amount this code takes off `amount`, ignoring usability.
    ///
    /// Never exceeds `amount`, so the final amount is never negative.
    /// `None` when the percentage math overflows.
    #[must_use]
    pub fn discount_for(&self, amount: Decimal) -> Option<Decimal> {
        let raw = match self.kind {
            DiscountKind::Percentage => percent_of(amount, self.discount)?,
            DiscountKind::Fixed => self.discount.min(amount),
        };
        Some(raw.clamp(Decimal::ZERO, amount.max(Decimal::ZERO)))
    }

    /// Quote this code against an order amount at `now`.
    ///
    /// # Errors
    ///
    /// Returns [`DiscountError::InvalidAmount`] for a negative amount or one
    /// past [`MAX_AMOUNT`](crate::MAX_AMOUNT), or the first failing usability
    /// check.
    pub fn quote(&self, amount: Decimal, now: DateTime<Utc>) -> Result<DiscountQuote, DiscountError> {
        if amount.is_sign_negative() || !within_amount_range(amount) {
            return Err(DiscountError::InvalidAmount);
        }
        self.ensure_usable(now)?;

        let discount_amount = self
            .discount_for(amount)
            .ok_or(DiscountError::InvalidAmount)?;
        Ok(DiscountQuote {
            original_amount: amount,
            discount_amount,
            final_amount: round_currency(amount - discount_amount),
        })
    }
}
