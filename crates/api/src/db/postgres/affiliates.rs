//! Affiliate profiles and referral history.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use sqlx::PgConnection;

use joestar_core::affiliate::{AffiliateProfile, Referral, redeem_code_candidates};
use joestar_core::{AffiliateTier, ReferralId, ReferralStatus, UserId};

use super::PgStore;
use crate::db::{AffiliateStore, CreditedReferral, REDEEM_CODE_TAKEN, RepositoryError};

const PROFILE_COLUMNS: &str = "user_id, redeem_code, tier, commission, total_earned";
const REFERRAL_COLUMNS: &str =
    "id, affiliate_id, referred_user_id, amount, commission, status, created_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: UserId,
    redeem_code: String,
    tier: AffiliateTier,
    commission: Decimal,
    total_earned: Decimal,
}

impl From<ProfileRow> for AffiliateProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            redeem_code: row.redeem_code,
            tier: row.tier,
            commission: row.commission,
            total_earned: row.total_earned,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReferralRow {
    id: ReferralId,
    affiliate_id: UserId,
    referred_user_id: Option<UserId>,
    amount: Decimal,
    commission: Decimal,
    status: ReferralStatus,
    created_at: DateTime<Utc>,
}

impl From<ReferralRow> for Referral {
    fn from(row: ReferralRow) -> Self {
        Self {
            id: row.id,
            affiliate_id: row.affiliate_id,
            referred_user_id: row.referred_user_id,
            amount: row.amount,
            commission: row.commission,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Insert a profile row under the first free redeem code candidate.
///
/// `None` when every candidate is taken or the user already has a row.
pub(super) async fn insert_profile(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Option<AffiliateProfile>, sqlx::Error> {
    for code in redeem_code_candidates(user_id) {
        let inserted = sqlx::query(
            r"
            INSERT INTO shop.affiliate_profiles (user_id, redeem_code)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(user_id)
        .bind(&code)
        .execute(&mut *conn)
        .await?;

        if inserted.rows_affected() == 1 {
            return Ok(Some(AffiliateProfile::with_redeem_code(user_id, code)));
        }
    }
    Ok(None)
}

#[async_trait]
impl AffiliateStore for PgStore {
    async fn get_affiliate(
        &self,
        user_id: UserId,
    ) -> Result<Option<AffiliateProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM shop.affiliate_profiles WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(AffiliateProfile::from))
    }

    async fn ensure_affiliate(&self, user_id: UserId) -> Result<AffiliateProfile, RepositoryError> {
        if let Some(profile) = self.get_affiliate(user_id).await? {
            return Ok(profile);
        }

        let mut conn = self.pool().acquire().await?;
        let inserted = insert_profile(&mut conn, user_id).await.map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;
        if let Some(profile) = inserted {
            return Ok(profile);
        }

        // Lost a race with another insert for this user, or every code is held
        self.get_affiliate(user_id)
            .await?
            .ok_or_else(|| RepositoryError::Conflict(REDEEM_CODE_TAKEN.to_owned()))
    }

    async fn find_affiliate_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AffiliateProfile>, RepositoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM shop.affiliate_profiles WHERE redeem_code = $1"
        ))
        .bind(code)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(AffiliateProfile::from))
    }

    async fn credit_referral(
        &self,
        code: &str,
        amount: Decimal,
        referred_user: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<CreditedReferral, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        // Row lock serializes concurrent credits to the same affiliate.
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            r"
            SELECT {PROFILE_COLUMNS}
            FROM shop.affiliate_profiles
            WHERE redeem_code = $1
            FOR UPDATE
            "
        ))
        .bind(code)
        .fetch_optional(&mut *tx)
        .await?;

        let mut profile = AffiliateProfile::from(row.ok_or(RepositoryError::NotFound)?);
        let credit = profile
            .credit(amount)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;

        sqlx::query(
            r"
            UPDATE shop.affiliate_profiles
            SET commission = $2, total_earned = $3, tier = $4, updated_at = NOW()
            WHERE user_id = $1
            ",
        )
        .bind(profile.user_id)
        .bind(profile.commission)
        .bind(profile.total_earned)
        .bind(profile.tier)
        .execute(&mut *tx)
        .await?;

        let referral: ReferralRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.affiliate_referrals
                (affiliate_id, referred_user_id, amount, commission, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {REFERRAL_COLUMNS}
            "
        ))
        .bind(profile.user_id)
        .bind(referred_user)
        .bind(amount)
        .bind(credit.commission)
        .bind(at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(CreditedReferral {
            profile,
            referral: referral.into(),
            credit,
        })
    }

    async fn list_referrals(&self, user_id: UserId) -> Result<Vec<Referral>, RepositoryError> {
        let rows: Vec<ReferralRow> = sqlx::query_as(&format!(
            r"
            SELECT {REFERRAL_COLUMNS}
            FROM shop.affiliate_referrals
            WHERE affiliate_id = $1
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(rows.into_iter().map(Referral::from).collect())
    }
}
