//! Discount code management commands.
//!
//! # Usage
//!
//! ```bash
//! joestar-cli discount create --code RAMADAN15 --discount 15 --type percentage \
//!     --max-uses 500 --valid-until 2027-04-30 --description "Ramadan sale"
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use joestar_core::discount::{DEFAULT_MAX_USES, DiscountCode};
use joestar_core::{DiscountId, DiscountKind};

use super::{CommandError, connect_store};
use joestar_api::db::{DiscountStore, RepositoryError};

/// Options for a new discount code.
#[derive(Debug)]
pub struct NewDiscount {
    pub code: String,
    pub discount: Decimal,
    pub kind: DiscountKind,
    pub max_uses: Option<i32>,
    pub valid_until: Option<String>,
    pub description: Option<String>,
}

/// Create a discount code.
///
/// # Errors
///
/// Returns an error if the options are invalid, the code already exists or
/// the database is unreachable.
pub async fn create(options: NewDiscount) -> Result<(), CommandError> {
    let discount = build(options)?;
    let store = connect_store().await?;

    store.insert_discount(&discount).await.map_err(|e| match e {
        RepositoryError::Conflict(_) => {
            CommandError::InvalidInput(format!("Discount code already exists: {}", discount.code))
        }
        other => other.into(),
    })?;

    tracing::info!(
        "Discount code created! Code: {}, Type: {}, Discount: {}, Max uses: {}",
        discount.code,
        discount.kind,
        discount.discount,
        discount.max_uses
    );
    Ok(())
}

/// Validate options into a stored code. Codes are kept uppercase.
fn build(options: NewDiscount) -> Result<DiscountCode, CommandError> {
    let code = options.code.trim().to_ascii_uppercase();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(CommandError::InvalidInput(format!(
            "Invalid code: {:?}. Use letters and digits only",
            options.code
        )));
    }

    if options.discount <= Decimal::ZERO {
        return Err(CommandError::InvalidInput(
            "Discount must be greater than zero".to_string(),
        ));
    }
    if options.kind == DiscountKind::Percentage && options.discount > Decimal::ONE_HUNDRED {
        return Err(CommandError::InvalidInput(
            "Percentage discount cannot exceed 100".to_string(),
        ));
    }

    let max_uses = options.max_uses.unwrap_or(DEFAULT_MAX_USES);
    if max_uses < 1 {
        return Err(CommandError::InvalidInput(
            "Max uses must be at least 1".to_string(),
        ));
    }

    let valid_until = options
        .valid_until
        .as_deref()
        .map(parse_valid_until)
        .transpose()?;

    Ok(DiscountCode {
        id: DiscountId::new(code.to_ascii_lowercase()),
        code,
        discount: options.discount,
        kind: options.kind,
        max_uses,
        used_count: 0,
        valid_until,
        active: true,
        description: options.description.filter(|d| !d.trim().is_empty()),
    })
}

/// Accept RFC 3339 or a bare date, which means the end of that day (UTC).
fn parse_valid_until(raw: &str) -> Result<DateTime<Utc>, CommandError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|at| at.and_utc())
        .ok_or_else(|| {
            CommandError::InvalidInput(format!(
                "Invalid --valid-until: {raw}. Use YYYY-MM-DD or RFC 3339"
            ))
        })
}
