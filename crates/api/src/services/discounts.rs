//! Discount code validation and redemption.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use joestar_core::discount::{DiscountCode, DiscountError, DiscountQuote};

use crate::db::Store;
use crate::error::{AppError, add_breadcrumb};

/// A quote together with the code it was computed for.
#[derive(Debug, Clone)]
pub struct QuotedDiscount {
    pub code: DiscountCode,
    pub quote: DiscountQuote,
}

/// Discount service.
pub struct DiscountService<'a> {
    store: &'a dyn Store,
}

impl<'a> DiscountService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Quote a code against an amount without consuming a use.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank code and `AppError::Discount`
    /// when the code is unknown, expired, exhausted or the amount is negative.
    pub async fn validate(
        &self,
        code: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<QuotedDiscount, AppError> {
        let code = self.lookup(code).await?;
        let quote = code.quote(amount, now)?;
        Ok(QuotedDiscount { code, quote })
    }

    /// Quote a code and consume one use of it.
    ///
    /// The store re-checks the usage limit and expiry at `now` in the same
    /// step as the increment, so a code can never be applied more than
    /// `max_uses` times or after it expires.
    ///
    /// # Errors
    ///
    /// Same as [`Self::validate`], plus `DiscountError::LimitExceeded` when
    /// another request used up the last redemption first.
    pub async fn apply(
        &self,
        code: &str,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> Result<QuotedDiscount, AppError> {
        let QuotedDiscount { code, quote } = self.validate(code, amount, now).await?;

        let code = self
            .store
            .record_discount_use(&code.id, now)
            .await?
            .ok_or(DiscountError::LimitExceeded)?;

        tracing::info!(
            code = %code.code,
            used_count = code.used_count,
            max_uses = code.max_uses,
            discount_amount = %quote.discount_amount,
            "Discount code applied"
        );
        add_breadcrumb(
            "discount",
            "Applied discount code",
            Some(&[("code", code.code.as_str())]),
        );

        Ok(QuotedDiscount { code, quote })
    }

    async fn lookup(&self, code: &str) -> Result<DiscountCode, AppError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Validation("Discount code is required".to_string()));
        }

        Ok(self
            .store
            .find_discount(code)
            .await?
            .ok_or(DiscountError::NotFound)?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use joestar_core::{DiscountId, DiscountKind};

    use crate::db::{DiscountStore, MemoryStore};

    fn discount(code: &str, kind: DiscountKind, amount: i64, max_uses: i32) -> DiscountCode {
        DiscountCode {
            id: DiscountId::new(code.to_lowercase()),
            code: code.to_string(),
            discount: Decimal::from(amount),
            kind,
            max_uses,
            used_count: 0,
            valid_until: None,
            active: true,
            description: None,
        }
    }

    #[tokio::test]
    async fn test_validate_does_not_consume() {
        let store = MemoryStore::new();
        store
            .insert_discount(&discount("WELCOME10", DiscountKind::Percentage, 10, 1))
            .await
            .unwrap();
        let service = DiscountService::new(&store);

        for _ in 0..3 {
            let quoted = service
                .validate("welcome10", Decimal::from(200_000), Utc::now())
                .await
                .unwrap();
            assert_eq!(quoted.quote.discount_amount, Decimal::from(20_000));
            assert_eq!(quoted.quote.final_amount, Decimal::from(180_000));
        }

        let stored = store.find_discount("WELCOME10").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 0);
    }

    #[tokio::test]
    async fn test_apply_until_limit() {
        let store = MemoryStore::new();
        store
            .insert_discount(&discount("FLAT50K", DiscountKind::Fixed, 50_000, 2))
            .await
            .unwrap();
        let service = DiscountService::new(&store);
        let amount = Decimal::from(30_000);

        let first = service.apply("FLAT50K", amount, Utc::now()).await.unwrap();
        assert_eq!(first.quote.discount_amount, amount);
        assert_eq!(first.quote.final_amount, Decimal::ZERO);
        assert_eq!(first.code.used_count, 1);

        service.apply("FLAT50K", amount, Utc::now()).await.unwrap();

        let err = service.apply("FLAT50K", amount, Utc::now()).await.unwrap_err();
        assert!(matches!(err, AppError::Discount(DiscountError::LimitExceeded)));
    }

    #[tokio::test]
    async fn test_concurrent_apply_never_overshoots() {
        let store = std::sync::Arc::new(MemoryStore::new());
        store
            .insert_discount(&discount("RACE", DiscountKind::Percentage, 5, 3))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                DiscountService::new(store.as_ref())
                    .apply("RACE", Decimal::from(1000), Utc::now())
                    .await
                    .is_ok()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if handle.await.unwrap() {
                applied += 1;
            }
        }
        assert_eq!(applied, 3);
        let stored = store.find_discount("RACE").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 3);
    }

    #[tokio::test]
    async fn test_rejections() {
        let store = MemoryStore::new();
        let mut expired = discount("OLD", DiscountKind::Percentage, 10, 5);
        expired.valid_until = Some(Utc::now() - Duration::days(1));
        store.insert_discount(&expired).await.unwrap();
        let service = DiscountService::new(&store);

        assert!(matches!(
            service.validate("NOPE", Decimal::ONE, Utc::now()).await,
            Err(AppError::Discount(DiscountError::NotFound))
        ));
        assert!(matches!(
            service.validate("OLD", Decimal::ONE, Utc::now()).await,
            Err(AppError::Discount(DiscountError::Expired))
        ));
        assert!(matches!(
            service.validate("  ", Decimal::ONE, Utc::now()).await,
            Err(AppError::Validation(_))
        ));
    }
}
