//! Affiliate commission and tier rules.
//!
//! Every user gets an [`AffiliateProfile`] when the account is created. A
//! purchase attributed to a redeem code credits that profile with a flat
//! commission and may move it up a tier. Tiers never move down through
//! crediting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{
    AffiliateTier, MAX_AMOUNT, ReferralId, ReferralStatus, UserId, round_currency,
    within_amount_range,
};

/// Flat commission rate applied to every attributed order (4%).
pub const COMMISSION_RATE: Decimal = Decimal::from_parts(4, 0, 0, false, 2);

/// Prefix shared by every redeem code.
pub const REDEEM_CODE_PREFIX: &str = "JOESTAR";

const SILVER_THRESHOLD: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);
const GOLD_THRESHOLD: Decimal = Decimal::from_parts(500_000, 0, 0, false, 0);
const DIAMOND_THRESHOLD: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Errors from affiliate rules.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AffiliateError {
    /// The attributed order amount is zero or negative.
    #[error("Order amount must be greater than zero")]
    InvalidAmount,
    /// The attributed order amount is past the currency range.
    #[error("Order amount is too large")]
    AmountTooLarge,
    /// Crediting would push the balance past the currency range.
    #[error("Affiliate balance limit reached")]
    BalanceLimit,
}

impl AffiliateTier {
    /// Highest tier whose threshold `total_earned` reaches. Boundaries are inclusive.
    #[must_use]
    pub fn for_total_earned(total_earned: Decimal) -> Self {
        if total_earned >= DIAMOND_THRESHOLD {
            Self::Diamond
        } else if total_earned >= GOLD_THRESHOLD {
            Self::Gold
        } else if total_earned >= SILVER_THRESHOLD {
            Self::Silver
        } else {
            Self::Bronze
        }
    }

    /// Lifetime earnings needed to reach this tier.
    #[must_use]
    pub const fn threshold(self) -> Decimal {
        match self {
            Self::Bronze => Decimal::ZERO,
            Self::Silver => SILVER_THRESHOLD,
            Self::Gold => GOLD_THRESHOLD,
            Self::Diamond => DIAMOND_THRESHOLD,
        }
    }

    /// The next tier up, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Bronze => Some(Self::Silver),
            Self::Silver => Some(Self::Gold),
            Self::Gold => Some(Self::Diamond),
            Self::Diamond => None,
        }
    }
}

/// Commission owed on an attributed order amount.
#[must_use]
pub fn commission_for(amount: Decimal) -> Decimal {
    round_currency(amount * COMMISSION_RATE)
}

/// Reject order amounts that cannot carry a commission.
///
/// # Errors
///
/// Returns [`AffiliateError::InvalidAmount`] when `amount` is not positive
/// and [`AffiliateError::AmountTooLarge`] past [`MAX_AMOUNT`].
pub fn validate_order_amount(amount: Decimal) -> Result<(), AffiliateError> {
    if amount <= Decimal::ZERO {
        return Err(AffiliateError::InvalidAmount);
    }
    if !within_amount_range(amount) {
        return Err(AffiliateError::AmountTooLarge);
    }
    Ok(())
}

/// Redeem code for a user: the prefix plus the last four characters of the
/// zero-padded id, upper-cased.
///
/// Two ids that share their last four digits map to the same code. Stores
/// assign codes through [`redeem_code_candidates`].
///
/// ```
/// use joestar_core::UserId;
/// use joestar_core::affiliate::redeem_code_for;
///
/// assert_eq!(redeem_code_for(UserId::new(7)), "JOESTAR0007");
/// assert_eq!(redeem_code_for(UserId::new(123_456)), "JOESTAR3456");
/// ```
#[must_use]
pub fn redeem_code_for(user_id: UserId) -> String {
    let padded = format!("{:04}", user_id.as_i32());
    let start = padded.len().saturating_sub(4);
    let suffix = padded.get(start..).unwrap_or(&padded);
    format!("{REDEEM_CODE_PREFIX}{}", suffix.to_uppercase())
}

/// Codes to try for a user, most preferred first.
///
/// The short form from [`redeem_code_for`] comes first. Past id 9999 it can
/// already belong to a lower id, so the full padded id follows. Full forms
/// of five or more digits never match a short form and are unique per id.
///
/// ```
/// use joestar_core::UserId;
/// use joestar_core::affiliate::redeem_code_candidates;
///
/// assert_eq!(redeem_code_candidates(UserId::new(7)), ["JOESTAR0007"]);
/// assert_eq!(
///     redeem_code_candidates(UserId::new(10_001)),
///     ["JOESTAR0001", "JOESTAR10001"]
/// );
/// ```
#[must_use]
pub fn redeem_code_candidates(user_id: UserId) -> Vec<String> {
    let short = redeem_code_for(user_id);
    let full = format!("{REDEEM_CODE_PREFIX}{:04}", user_id.as_i32());
    if short == full {
        vec![short]
    } else {
        vec![short, full]
    }
}

/// A user's affiliate standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateProfile {
    pub user_id: UserId,
    pub redeem_code: String,
    pub tier: AffiliateTier,
    /// Unpaid commission balance.
    pub commission: Decimal,
    /// Lifetime commission, which drives the tier.
    pub total_earned: Decimal,
}

/// Outcome of crediting a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralCredit {
    pub commission: Decimal,
    pub previous_tier: AffiliateTier,
    pub tier: AffiliateTier,
}

impl ReferralCredit {
    /// Whether this credit moved the profile up a tier.
    #[must_use]
    pub fn upgraded(&self) -> bool {
        self.tier > self.previous_tier
    }
}

/// Distance to the next tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierProgress {
    pub next_tier: AffiliateTier,
    pub threshold: Decimal,
    pub remaining: Decimal,
}

impl AffiliateProfile {
    /// A fresh Bronze profile with nothing earned, under the short code.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self::with_redeem_code(user_id, redeem_code_for(user_id))
    }

    /// A fresh Bronze profile under an already assigned code.
    #[must_use]
    pub const fn with_redeem_code(user_id: UserId, redeem_code: String) -> Self {
        Self {
            user_id,
            redeem_code,
            tier: AffiliateTier::Bronze,
            commission: Decimal::ZERO,
            total_earned: Decimal::ZERO,
        }
    }

    /// Credit the commission for an attributed order amount.
    ///
    /// The profile is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns the [`validate_order_amount`] errors, or
    /// [`AffiliateError::BalanceLimit`] when the balance or lifetime total
    /// would pass [`MAX_AMOUNT`].
    pub fn credit(&mut self, amount: Decimal) -> Result<ReferralCredit, AffiliateError> {
        validate_order_amount(amount)?;
        let commission = commission_for(amount);
        let add = |balance: Decimal| {
            balance
                .checked_add(commission)
                .filter(|sum| *sum <= MAX_AMOUNT)
                .ok_or(AffiliateError::BalanceLimit)
        };
        let balance = add(self.commission)?;
        let total_earned = add(self.total_earned)?;

        let previous_tier = self.tier;
        self.commission = balance;
        self.total_earned = total_earned;
        self.tier = previous_tier.max(AffiliateTier::for_total_earned(total_earned));

        Ok(ReferralCredit {
            commission,
            previous_tier,
            tier: self.tier,
        })
    }

    /// How far this profile is from the next tier, or `None` at Diamond.
    #[must_use]
    pub fn next_tier(&self) -> Option<TierProgress> {
        let next_tier = self.tier.next()?;
        let threshold = next_tier.threshold();
        Some(TierProgress {
            next_tier,
            threshold,
            remaining: (threshold - self.total_earned).max(Decimal::ZERO),
        })
    }
}

/// A purchase credited to an affiliate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Referral {
    pub id: ReferralId,
    pub affiliate_id: UserId,
    pub referred_user_id: Option<UserId>,
    pub amount: Decimal,
    pub commission: Decimal,
    pub status: ReferralStatus,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries_inclusive() {
        assert_eq!(
            AffiliateTier::for_total_earned(Decimal::from(99_999)),
            AffiliateTier::Bronze
        );
        assert_eq!(
            AffiliateTier::for_total_earned(Decimal::from(100_000)),
            AffiliateTier::Silver
        );
        assert_eq!(
            AffiliateTier::for_total_earned(Decimal::from(499_999)),
            AffiliateTier::Silver
        );
        assert_eq!(
            AffiliateTier::for_total_earned(Decimal::from(500_000)),
            AffiliateTier::Gold
        );
        assert_eq!(
            AffiliateTier::for_total_earned(Decimal::from(1_000_000)),
            AffiliateTier::Diamond
        );
        assert_eq!(
            AffiliateTier::for_total_earned(Decimal::new(9_999_999, 2)),
            AffiliateTier::Bronze
        );
    }

    #[test]
    fn test_commission_is_four_percent() {
        assert_eq!(commission_for(Decimal::from(1_000_000)), Decimal::from(40_000));
        assert_eq!(commission_for(Decimal::new(12_345, 2)), Decimal::new(494, 2));
    }

    #[test]
    fn test_redeem_code_uses_last_four_digits() {
        assert_eq!(redeem_code_for(UserId::new(1)), "JOESTAR0001");
        assert_eq!(redeem_code_for(UserId::new(4_321)), "JOESTAR4321");
        assert_eq!(redeem_code_for(UserId::new(98_765)), "JOESTAR8765");
    }

    #[test]
    fn test_redeem_code_candidates_fall_back_to_full_id() {
        assert_eq!(redeem_code_candidates(UserId::new(9_999)), ["JOESTAR9999"]);
        assert_eq!(
            redeem_code_candidates(UserId::new(10_000)),
            ["JOESTAR0000", "JOESTAR10000"]
        );
        assert_eq!(
            redeem_code_candidates(UserId::new(123_456)),
            ["JOESTAR3456", "JOESTAR123456"]
        );
    }

    #[test]
    fn test_credit_rejects_bad_amounts_without_change() {
        let mut profile = AffiliateProfile::new(UserId::new(1));
        let before = profile.clone();

        assert_eq!(profile.credit(Decimal::ZERO), Err(AffiliateError::InvalidAmount));
        assert_eq!(profile.credit(Decimal::MAX), Err(AffiliateError::AmountTooLarge));
        assert_eq!(profile, before);
    }

    #[test]
    fn test_credit_stops_at_balance_limit() {
        let mut profile = AffiliateProfile::new(UserId::new(1));
        profile.total_earned = MAX_AMOUNT - Decimal::ONE;
        let before = profile.clone();

        assert_eq!(
            profile.credit(Decimal::from(1_000)),
            Err(AffiliateError::BalanceLimit)
        );
        assert_eq!(profile, before);

        // Small enough to still fit
        assert!(profile.credit(Decimal::from(25)).is_ok());
        assert_eq!(profile.total_earned, MAX_AMOUNT);
    }

    #[test]
    fn test_credit_accumulates_and_upgrades() {
        let mut profile = AffiliateProfile::new(UserId::new(1));

        let credit = profile.credit(Decimal::from(1_500_000)).unwrap();
        assert_eq!(credit.commission, Decimal::from(60_000));
        assert!(!credit.upgraded());
        assert_eq!(profile.tier, AffiliateTier::Bronze);

        let credit = profile.credit(Decimal::from(1_000_000)).unwrap();
        assert_eq!(credit.commission, Decimal::from(40_000));
        assert!(credit.upgraded());
        assert_eq!(profile.tier, AffiliateTier::Silver);
        assert_eq!(profile.commission, Decimal::from(100_000));
        assert_eq!(profile.total_earned, Decimal::from(100_000));
    }

    #[test]
    fn test_credit_never_downgrades() {
        let mut profile = AffiliateProfile::new(UserId::new(1));
        profile.tier = AffiliateTier::Gold;

        profile.credit(Decimal::from(100)).unwrap();
        assert_eq!(profile.tier, AffiliateTier::Gold);
    }

    #[test]
    fn test_balance_and_total_move_together() {
        let mut profile = AffiliateProfile::new(UserId::new(1));
        profile.commission = Decimal::ZERO;
        profile.total_earned = Decimal::from(50_000);

        profile.credit(Decimal::from(250_000)).unwrap();
        assert_eq!(profile.commission, Decimal::from(10_000));
        assert_eq!(profile.total_earned, Decimal::from(60_000));
    }

    #[test]
    fn test_validate_order_amount() {
        assert!(validate_order_amount(Decimal::ONE).is_ok());
        assert_eq!(
            validate_order_amount(Decimal::ZERO),
            Err(AffiliateError::InvalidAmount)
        );
        assert_eq!(
            validate_order_amount(Decimal::from(-5)),
            Err(AffiliateError::InvalidAmount)
        );
        assert!(validate_order_amount(MAX_AMOUNT).is_ok());
        assert_eq!(
            validate_order_amount(MAX_AMOUNT + Decimal::ONE),
            Err(AffiliateError::AmountTooLarge)
        );
    }

    #[test]
    fn test_next_tier_progress() {
        let mut profile = AffiliateProfile::new(UserId::new(1));
        profile.total_earned = Decimal::from(30_000);

        let progress = profile.next_tier().unwrap();
        assert_eq!(progress.next_tier, AffiliateTier::Silver);
        assert_eq!(progress.remaining, Decimal::from(70_000));

        profile.tier = AffiliateTier::Diamond;
        assert!(profile.next_tier().is_none());
    }
}
