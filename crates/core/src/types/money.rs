//! Money helpers using decimal arithmetic.
//!
//! All amounts are plain `Decimal` values in rupiah. There is a single
//! currency, so no currency code travels with the amount. Every derived
//! amount (discounts, commissions, totals) goes through [`round_currency`]
//! before it is stored or returned.

use rust_decimal::{Decimal, RoundingStrategy};

/// Number of decimal places kept for currency amounts.
pub const CURRENCY_SCALE: u32 = 2;

/// Largest amount a `NUMERIC(14, 2)` column holds: 999,999,999,999.99.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, CURRENCY_SCALE);

/// Round an amount to currency precision, half away from zero.
///
/// ```
/// use joestar_core::round_currency;
/// use rust_decimal::Decimal;
///
/// assert_eq!(round_currency(Decimal::new(12_345, 3)), Decimal::new(1_235, 2));
/// ```
#[must_use]
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Return `rate` percent of `amount`, rounded to currency precision.
///
/// `None` when the product does not fit in a `Decimal`.
#[must_use]
pub fn percent_of(amount: Decimal, rate: Decimal) -> Option<Decimal> {
    amount
        .checked_mul(rate)?
        .checked_div(Decimal::ONE_HUNDRED)
        .map(round_currency)
}

/// Whether `amount` fits the stored currency range, sign aside.
#[must_use]
pub fn within_amount_range(amount: Decimal) -> bool {
    amount.abs() <= MAX_AMOUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_currency_midpoint() {
        assert_eq!(round_currency(Decimal::new(5, 3)), Decimal::new(1, 2));
        assert_eq!(round_currency(Decimal::new(-5, 3)), Decimal::new(-1, 2));
        assert_eq!(round_currency(Decimal::new(4, 3)), Decimal::ZERO);
    }

    #[test]
    fn test_round_currency_keeps_whole_amounts() {
        assert_eq!(round_currency(Decimal::from(150_000)), Decimal::from(150_000));
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(
            percent_of(Decimal::from(250_000), Decimal::from(10)),
            Some(Decimal::from(25_000))
        );
        // 33.333...% of 100 rounds to 33.33
        assert_eq!(
            percent_of(Decimal::from(100), Decimal::new(33_333, 3)),
            Some(Decimal::new(3_333, 2))
        );
    }

    #[test]
    fn test_percent_of_overflow_is_none() {
        assert_eq!(percent_of(Decimal::MAX, Decimal::from(10)), None);
    }

    #[test]
    fn test_max_amount_matches_column_range() {
        assert_eq!(MAX_AMOUNT.to_string(), "999999999999.99");
        assert!(within_amount_range(MAX_AMOUNT));
        assert!(!within_amount_range(MAX_AMOUNT + Decimal::new(1, 2)));
    }
}
