//! HTTP route handlers for the JSON API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /api/health                 - Liveness check
//! GET  /api/health/ready           - Readiness check (store ping)
//!
//! # Auth (register/login have a stricter rate limit)
//! POST /api/auth/register          - Create account, issue token
//! POST /api/auth/login             - Issue token
//! GET  /api/auth/profile           - Current user (requires auth)
//! PUT  /api/auth/profile           - Update name/email (requires auth)
//! PUT  /api/auth/change-password   - Change password (requires auth)
//!
//! # Affiliate
//! GET  /api/affiliate/dashboard    - Profile, tier progress, referrals (requires auth)
//! POST /api/affiliate/generate-code - Ensure a redeem code (requires auth)
//! POST /api/affiliate/track        - Credit a referral
//!
//! # Discounts
//! POST /api/discount/validate      - Quote a code without using it
//! POST /api/discount/apply         - Quote and consume one use
//!
//! # Catalog
//! GET  /api/products               - Listing (?category&search&featured&sort)
//! GET  /api/products/{id}          - Product detail
//!
//! # Account (requires auth)
//! GET    /api/wishlist             - Wishlist with products
//! POST   /api/wishlist             - Add a product
//! DELETE /api/wishlist/{productId} - Remove a product
//! GET    /api/orders               - Recent orders
//! POST   /api/orders               - Place an order
//!
//! # Content & engagement
//! GET  /api/testimonials           - All testimonials
//! POST /api/testimonials           - Submit (verified when logged in)
//! GET  /api/ebooks                 - Listing (?category&featured)
//! GET  /api/ebooks/{id}            - E-book detail
//! POST /api/ebooks/{id}/download   - Count a download
//! POST /api/newsletter/subscribe   - Subscribe or reactivate
//! POST /api/newsletter/unsubscribe - Unsubscribe
//! POST /api/contact                - Contact form
//! GET  /api/blog                   - Posts (?category&featured&limit)
//! GET  /api/blog/{slug}            - Post detail
//! ```

pub mod affiliate;
pub mod auth;
pub mod blog;
pub mod contact;
pub mod discount;
pub mod ebooks;
pub mod health;
pub mod newsletter;
pub mod orders;
pub mod products;
pub mod testimonials;
pub mod wishlist;

use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::error::AppError;
use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
///
/// The credential routes are registered first so the optional limiter only
/// covers them.
pub fn auth_routes(rate_limited: bool) -> Router<AppState> {
    let credentials = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login));
    let credentials = if rate_limited {
        credentials.layer(auth_rate_limiter())
    } else {
        credentials
    };

    credentials
        .route("/profile", get(auth::profile).put(auth::update_profile))
        .route("/change-password", put(auth::change_password))
}

/// Create the affiliate routes router.
pub fn affiliate_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(affiliate::dashboard))
        .route("/generate-code", post(affiliate::generate_code))
        .route("/track", post(affiliate::track))
}

/// Create the discount routes router.
pub fn discount_routes() -> Router<AppState> {
    Router::new()
        .route("/validate", post(discount::validate))
        .route("/apply", post(discount::apply))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show).post(wishlist::add))
        .route("/{product_id}", delete(wishlist::remove))
}

/// Create the e-book routes router.
pub fn ebook_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(ebooks::index))
        .route("/{id}", get(ebooks::show))
        .route("/{id}/download", post(ebooks::download))
}

/// Create the newsletter routes router.
pub fn newsletter_routes() -> Router<AppState> {
    Router::new()
        .route("/subscribe", post(newsletter::subscribe))
        .route("/unsubscribe", post(newsletter::unsubscribe))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::index))
        .route("/{slug}", get(blog::show))
}

/// Create all routes for the API.
///
/// Rate limiting keys on the client IP, so it needs the server to be run
/// with connect info. In-process tests pass `false`.
pub fn routes(rate_limited: bool) -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes(rate_limited))
        .nest("/affiliate", affiliate_routes())
        .nest("/discount", discount_routes())
        .nest("/products", product_routes())
        .nest("/wishlist", wishlist_routes())
        .route("/orders", get(orders::index).post(orders::create))
        .route(
            "/testimonials",
            get(testimonials::index).post(testimonials::create),
        )
        .nest("/ebooks", ebook_routes())
        .nest("/newsletter", newsletter_routes())
        .route("/contact", post(contact::submit))
        .nest("/blog", blog_routes());
    let api = if rate_limited {
        api.layer(api_rate_limiter())
    } else {
        api
    };

    Router::new()
        .route("/api/health", get(health::health))
        .route("/api/health/ready", get(health::readiness))
        .nest("/api", api)
        .fallback(fallback)
}

/// JSON 404 for unknown routes.
async fn fallback() -> AppError {
    AppError::NotFound("Route not found".to_string())
}
