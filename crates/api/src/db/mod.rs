//! Persistence for the Joestar API.
//!
//! Handlers never reach a database directly. They go through the [`Store`]
//! trait object held in `AppState`, which has two implementations:
//!
//! - [`PgStore`] - `PostgreSQL` via sqlx (production)
//! - [`MemoryStore`] - in-process tables behind one mutex per logical store
//!   (tests and local development)
//!
//! # Database schema: `shop`
//!
//! - `users` - Accounts, wishlists, referral attribution
//! - `affiliate_profiles` / `affiliate_referrals` - Affiliate standing and history
//! - `products` - Catalog
//! - `discount_codes` - Redeemable codes
//! - `orders` / `order_items` - Orders and immutable line items
//! - `testimonials`, `ebooks`, `newsletter_subscribers`, `contact_messages`
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p joestar-cli -- migrate
//! ```

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use joestar_core::affiliate::{AffiliateProfile, Referral, ReferralCredit};
use joestar_core::catalog::{Product, ProductQuery};
use joestar_core::discount::DiscountCode;
use joestar_core::order::{NewOrder, Order};
use joestar_core::wishlist::Wishlist;
use joestar_core::{DiscountId, EbookId, Email, ProductId, UserId};

use crate::models::{
    ContactMessage, Ebook, NewContactMessage, NewTestimonial, NewUser, SubscribeOutcome,
    Testimonial, User,
};

/// `Conflict` message for a registration email that is already taken.
pub const DUPLICATE_EMAIL: &str = "email already exists";

/// `Conflict` message when no redeem code candidate is free.
pub const REDEEM_CODE_TAKEN: &str = "redeem code already exists";

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// A credited referral together with the affiliate's updated standing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditedReferral {
    pub profile: AffiliateProfile,
    pub referral: Referral,
    pub credit: ReferralCredit,
}

/// Accounts, credentials and wishlists.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user and its affiliate profile in one unit of work.
    ///
    /// Returns `Conflict` if the email (or the derived redeem code) is taken.
    async fn create_user(
        &self,
        new_user: NewUser,
    ) -> Result<(User, AffiliateProfile), RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    async fn get_user_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError>;

    /// A user and their password hash, looked up by email.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn get_password_hash(&self, id: UserId) -> Result<Option<String>, RepositoryError>;

    /// Returns `Conflict` if `email` belongs to another user, `NotFound` if
    /// the user is gone.
    async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError>;

    async fn update_password(&self, id: UserId, password_hash: &str)
    -> Result<(), RepositoryError>;

    async fn get_wishlist(&self, id: UserId) -> Result<Wishlist, RepositoryError>;

    /// Returns `Conflict` if the product is already listed.
    async fn add_to_wishlist(
        &self,
        id: UserId,
        product_id: &ProductId,
    ) -> Result<Wishlist, RepositoryError>;

    /// Returns `NotFound` if the product is not listed.
    async fn remove_from_wishlist(
        &self,
        id: UserId,
        product_id: &ProductId,
    ) -> Result<Wishlist, RepositoryError>;
}

/// Affiliate profiles and referral history.
#[async_trait]
pub trait AffiliateStore: Send + Sync {
    async fn get_affiliate(
        &self,
        user_id: UserId,
    ) -> Result<Option<AffiliateProfile>, RepositoryError>;

    /// Return the user's profile, creating a fresh one if it is missing.
    async fn ensure_affiliate(&self, user_id: UserId) -> Result<AffiliateProfile, RepositoryError>;

    /// Exact match on the redeem code.
    async fn find_affiliate_by_code(
        &self,
        code: &str,
    ) -> Result<Option<AffiliateProfile>, RepositoryError>;

    /// Credit the affiliate owning `code` for an attributed order amount.
    ///
    /// Runs as one read-modify-write with the profile locked. Returns
    /// `NotFound` if no profile has this code.
    async fn credit_referral(
        &self,
        code: &str,
        amount: Decimal,
        referred_user: Option<UserId>,
        at: DateTime<Utc>,
    ) -> Result<CreditedReferral, RepositoryError>;

    /// Referrals credited to `user_id`, newest first.
    async fn list_referrals(&self, user_id: UserId) -> Result<Vec<Referral>, RepositoryError>;
}

/// Product catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;

    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Products for the given ids, in the order the ids are given. Unknown
    /// ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn upsert_product(&self, product: &Product) -> Result<(), RepositoryError>;
}

/// Discount codes.
#[async_trait]
pub trait DiscountStore: Send + Sync {
    /// Active code matching `code` case-insensitively.
    async fn find_discount(&self, code: &str) -> Result<Option<DiscountCode>, RepositoryError>;

    /// Consume one use of a code at `now`.
    ///
    /// The check and the increment are a single atomic step, so concurrent
    /// callers can never push `used_count` past `max_uses`. Returns `None`
    /// when the code is inactive, expired at `now` or already exhausted.
    async fn record_discount_use(
        &self,
        id: &DiscountId,
        now: DateTime<Utc>,
    ) -> Result<Option<DiscountCode>, RepositoryError>;

    /// Insert a new code. Returns `Conflict` if the id or the code (ignoring
    /// case) already exists.
    async fn insert_discount(&self, discount: &DiscountCode) -> Result<(), RepositoryError>;
}

/// Orders and line items.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// The user's most recent orders, newest first.
    async fn list_orders(&self, user_id: UserId, limit: i64)
    -> Result<Vec<Order>, RepositoryError>;
}

/// Testimonials.
#[async_trait]
pub trait TestimonialStore: Send + Sync {
    /// All testimonials, newest first.
    async fn list_testimonials(&self) -> Result<Vec<Testimonial>, RepositoryError>;

    async fn create_testimonial(
        &self,
        testimonial: NewTestimonial,
    ) -> Result<Testimonial, RepositoryError>;

    async fn count_testimonials(&self) -> Result<i64, RepositoryError>;
}

/// E-books.
#[async_trait]
pub trait EbookStore: Send + Sync {
    async fn list_ebooks(
        &self,
        category: Option<&str>,
        featured: Option<bool>,
    ) -> Result<Vec<Ebook>, RepositoryError>;

    async fn get_ebook(&self, id: &EbookId) -> Result<Option<Ebook>, RepositoryError>;

    /// Atomically bump the download counter. `None` if the e-book is missing.
    async fn record_download(&self, id: &EbookId) -> Result<Option<Ebook>, RepositoryError>;

    /// Insert or update an e-book, leaving its download counter untouched.
    async fn upsert_ebook(&self, ebook: &Ebook) -> Result<(), RepositoryError>;
}

/// Newsletter subscriptions.
#[async_trait]
pub trait NewsletterStore: Send + Sync {
    async fn subscribe(
        &self,
        email: &Email,
        name: Option<&str>,
    ) -> Result<SubscribeOutcome, RepositoryError>;

    /// Deactivate a subscription. `false` if there was no active one.
    async fn unsubscribe(&self, email: &Email) -> Result<bool, RepositoryError>;
}

/// Contact form messages.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn create_contact_message(
        &self,
        message: NewContactMessage,
    ) -> Result<ContactMessage, RepositoryError>;
}

/// Everything the API persists.
#[async_trait]
pub trait Store:
    UserStore
    + AffiliateStore
    + CatalogStore
    + DiscountStore
    + OrderStore
    + TestimonialStore
    + EbookStore
    + NewsletterStore
    + ContactStore
{
    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
