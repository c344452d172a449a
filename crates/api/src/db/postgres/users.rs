//! Users, credentials and wishlists.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use joestar_core::affiliate::AffiliateProfile;
use joestar_core::wishlist::Wishlist;
use joestar_core::{Email, ProductId, UserId};

use super::affiliates::insert_profile;
use super::{PgStore, conflict_on_unique};
use crate::db::{DUPLICATE_EMAIL, REDEEM_CODE_TAKEN, RepositoryError, UserStore};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, name, email, referred_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
    referred_by: Option<UserId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            referred_by: row.referred_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

fn wishlist_from(ids: Vec<String>) -> Wishlist {
    Wishlist::from_ids(ids.into_iter().map(ProductId::from))
}

impl PgStore {
    async fn user_exists(&self, id: UserId) -> Result<bool, RepositoryError> {
        let (exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS (SELECT 1 FROM shop.users WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool())
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(
        &self,
        new_user: NewUser,
    ) -> Result<(User, AffiliateProfile), RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO shop.users (name, email, password_hash, referred_by)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.referred_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, DUPLICATE_EMAIL))?;

        let user = User::from(row);
        let profile = insert_profile(&mut tx, user.id)
            .await?
            .ok_or_else(|| RepositoryError::Conflict(REDEEM_CODE_TAKEN.to_owned()))?;

        tx.commit().await?;

        Ok((user, profile))
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM shop.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM shop.users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<CredentialRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM shop.users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        Ok(row.map(|r| (User::from(r.user), r.password_hash)))
    }

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM shop.users WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        Ok(row.map(|(hash,)| hash))
    }

    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r"
            UPDATE shop.users
            SET name = $2, email = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "email already in use"))?;

        row.map(User::from).ok_or(RepositoryError::NotFound)
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE shop.users SET password_hash = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn get_wishlist(&self, id: UserId) -> Result<Wishlist, RepositoryError> {
        let row: Option<(Vec<String>,)> =
            sqlx::query_as("SELECT wishlist FROM shop.users WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        row.map(|(ids,)| wishlist_from(ids))
            .ok_or(RepositoryError::NotFound)
    }

    async fn add_to_wishlist(
        &self,
        id: UserId,
        product_id: &ProductId,
    ) -> Result<Wishlist, RepositoryError> {
        let row: Option<(Vec<String>,)> = sqlx::query_as(
            r"
            UPDATE shop.users
            SET wishlist = array_append(wishlist, $2::text), updated_at = NOW()
            WHERE id = $1 AND NOT ($2::text = ANY (wishlist))
            RETURNING wishlist
            ",
        )
        .bind(id)
        .bind(product_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some((ids,)) => Ok(wishlist_from(ids)),
            None if self.user_exists(id).await? => Err(RepositoryError::Conflict(
                "product already in wishlist".to_owned(),
            )),
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn remove_from_wishlist(
        &self,
        id: UserId,
        product_id: &ProductId,
    ) -> Result<Wishlist, RepositoryError> {
        let row: Option<(Vec<String>,)> = sqlx::query_as(
            r"
            UPDATE shop.users
            SET wishlist = array_remove(wishlist, $2::text), updated_at = NOW()
            WHERE id = $1 AND $2::text = ANY (wishlist)
            RETURNING wishlist
            ",
        )
        .bind(id)
        .bind(product_id.as_str())
        .fetch_optional(self.pool())
        .await?;

        row.map(|(ids,)| wishlist_from(ids))
            .ok_or(RepositoryError::NotFound)
    }
}
