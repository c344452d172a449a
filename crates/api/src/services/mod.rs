//! Business logic services for the API.
//!
//! Services borrow the store for the duration of one request and hold no
//! state of their own.
//!
//! # Services
//!
//! - `auth` - Registration, login, profile and password changes
//! - `token` - Bearer token issuing and verification
//! - `discounts` - Discount code validation and redemption
//! - `affiliates` - Affiliate dashboard and referral crediting
//! - `orders` - Order placement and history

pub mod affiliates;
pub mod auth;
pub mod discounts;
pub mod orders;
pub mod token;

pub use affiliates::AffiliateService;
pub use auth::{AuthError, AuthService};
pub use discounts::DiscountService;
pub use orders::OrderService;
pub use token::{Claims, TokenError, TokenService};
