//! Affiliate dashboard, code issuing and referral tracking.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use joestar_core::UserId;
use joestar_core::affiliate::{AffiliateProfile, Referral, TierProgress, validate_order_amount};

use crate::db::{CreditedReferral, RepositoryError, Store};
use crate::error::{AppError, add_breadcrumb};

/// Everything the affiliate dashboard shows.
#[derive(Debug, Clone)]
pub struct Dashboard {
    pub profile: AffiliateProfile,
    pub next_tier: Option<TierProgress>,
    pub referrals: Vec<Referral>,
}

/// Affiliate service.
pub struct AffiliateService<'a> {
    store: &'a dyn Store,
}

impl<'a> AffiliateService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Profile, tier progress and referral history for a user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no affiliate profile.
    pub async fn dashboard(&self, user_id: UserId) -> Result<Dashboard, AppError> {
        let profile = self
            .store
            .get_affiliate(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Affiliate profile not found".to_string()))?;
        let referrals = self.store.list_referrals(user_id).await?;

        Ok(Dashboard {
            next_tier: profile.next_tier(),
            profile,
            referrals,
        })
    }

    /// The user's affiliate profile, created on first request.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user doesn't exist and a conflict
    /// if the derived redeem code belongs to another user.
    pub async fn generate_code(&self, user_id: UserId) -> Result<AffiliateProfile, AppError> {
        self.store
            .ensure_affiliate(user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AppError::NotFound("User not found".to_string()),
                other => other.into(),
            })
    }

    /// Credit the affiliate owning `code` for an order amount.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for a blank code or a self-referral,
    /// `AppError::Affiliate` for a non-positive amount and
    /// `AppError::NotFound` for an unknown code.
    pub async fn track(
        &self,
        code: &str,
        amount: Decimal,
        referred_user: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<CreditedReferral, AppError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(AppError::Validation("Affiliate code is required".to_string()));
        }
        validate_order_amount(amount)?;

        let affiliate = self
            .store
            .find_affiliate_by_code(code)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid affiliate code".to_string()))?;
        if referred_user == Some(affiliate.user_id) {
            return Err(AppError::Validation(
                "You cannot use your own affiliate code".to_string(),
            ));
        }

        let credited = self
            .store
            .credit_referral(code, amount, referred_user, now)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    AppError::NotFound("Invalid affiliate code".to_string())
                }
                other => other.into(),
            })?;

        record_credit(&credited);
        Ok(credited)
    }
}

fn record_credit(credited: &CreditedReferral) {
    let affiliate = credited.profile.user_id.to_string();
    tracing::info!(
        affiliate_id = %affiliate,
        amount = %credited.referral.amount,
        commission = %credited.credit.commission,
        tier = %credited.credit.tier,
        "Referral credited"
    );

    if credited.credit.upgraded() {
        let tier = credited.credit.tier.to_string();
        tracing::info!(
            affiliate_id = %affiliate,
            from = %credited.credit.previous_tier,
            to = %tier,
            "Affiliate tier upgraded"
        );
        add_breadcrumb(
            "affiliate",
            "Tier upgraded",
            Some(&[("affiliate_id", affiliate.as_str()), ("tier", tier.as_str())]),
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use joestar_core::affiliate::AffiliateError;
    use joestar_core::{AffiliateTier, Email};

    use crate::db::{MemoryStore, UserStore};
    use crate::models::{NewUser, User};

    async fn user(store: &MemoryStore, email: &str) -> (User, AffiliateProfile) {
        store
            .create_user(NewUser {
                name: "Joseph".to_string(),
                email: Email::parse(email).unwrap(),
                password_hash: "$argon2id$stub".to_string(),
                referred_by: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_track_credits_commission() {
        let store = MemoryStore::new();
        let (_, profile) = user(&store, "a@example.com").await;
        let (buyer, _) = user(&store, "b@example.com").await;
        let service = AffiliateService::new(&store);

        let credited = service
            .track(&profile.redeem_code, Decimal::from(1_000_000), Some(buyer.id), Utc::now())
            .await
            .unwrap();
        assert_eq!(credited.credit.commission, Decimal::from(40_000));
        assert_eq!(credited.profile.tier, AffiliateTier::Bronze);

        let dashboard = service.dashboard(profile.user_id).await.unwrap();
        assert_eq!(dashboard.profile.total_earned, Decimal::from(40_000));
        assert_eq!(dashboard.referrals.len(), 1);
        let next = dashboard.next_tier.unwrap();
        assert_eq!(next.next_tier, AffiliateTier::Silver);
        assert_eq!(next.remaining, Decimal::from(60_000));
    }

    #[tokio::test]
    async fn test_track_reaches_silver() {
        let store = MemoryStore::new();
        let (_, profile) = user(&store, "a@example.com").await;
        let service = AffiliateService::new(&store);

        service
            .track(&profile.redeem_code, Decimal::from(1_500_000), None, Utc::now())
            .await
            .unwrap();
        let credited = service
            .track(&profile.redeem_code, Decimal::from(1_000_000), None, Utc::now())
            .await
            .unwrap();

        assert!(credited.credit.upgraded());
        assert_eq!(credited.profile.tier, AffiliateTier::Silver);
        assert_eq!(credited.profile.total_earned, Decimal::from(100_000));
    }

    #[tokio::test]
    async fn test_track_rejections() {
        let store = MemoryStore::new();
        let (owner, profile) = user(&store, "a@example.com").await;
        let service = AffiliateService::new(&store);

        assert!(matches!(
            service.track(&profile.redeem_code, Decimal::ZERO, None, Utc::now()).await,
            Err(AppError::Affiliate(AffiliateError::InvalidAmount))
        ));
        assert!(matches!(
            service.track("JOESTAR9999", Decimal::ONE, None, Utc::now()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service
                .track(&profile.redeem_code, Decimal::ONE, Some(owner.id), Utc::now())
                .await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_generate_code_is_stable() {
        let store = MemoryStore::new();
        let (owner, profile) = user(&store, "a@example.com").await;
        let service = AffiliateService::new(&store);

        let again = service.generate_code(owner.id).await.unwrap();
        assert_eq!(again.redeem_code, profile.redeem_code);

        assert!(matches!(
            service.generate_code(UserId::new(999)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
