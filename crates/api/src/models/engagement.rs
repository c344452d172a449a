//! Testimonials, e-books, newsletter subscribers and contact messages.
//!
//! Independent flat records with no cross-entity invariants beyond an
//! optional link to the user who created them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use joestar_core::{ContactMessageId, EbookId, Email, SubscriberId, TestimonialId, UserId};

/// Location stored when a testimonial does not name one.
pub const DEFAULT_LOCATION: &str = "Indonesia";

/// Language assumed for e-books that do not name one.
pub const DEFAULT_LANGUAGE: &str = "Indonesia";

/// A customer testimonial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Testimonial {
    pub id: TestimonialId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub name: String,
    pub location: String,
    pub rating: i16,
    pub text: String,
    pub product: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for a testimonial. Also the seed file shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTestimonial {
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub name: String,
    #[serde(default = "default_location")]
    pub location: String,
    pub rating: i16,
    pub text: String,
    pub product: String,
    #[serde(default)]
    pub verified: bool,
}

fn default_location() -> String {
    DEFAULT_LOCATION.to_owned()
}

/// A downloadable e-book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ebook {
    pub id: EbookId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub pages: Option<i32>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub preview_url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub downloads: i32,
    #[serde(default)]
    pub featured: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_owned()
}

impl Ebook {
    /// Whether this e-book passes the listing filters.
    #[must_use]
    pub fn matches(&self, category: Option<&str>, featured: Option<bool>) -> bool {
        let category_ok = category.is_none_or(|wanted| {
            self.category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(wanted))
        });
        let featured_ok = featured.is_none_or(|wanted| self.featured == wanted);
        category_ok && featured_ok
    }
}

/// A newsletter subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterSubscriber {
    pub id: SubscriberId,
    pub email: Email,
    pub name: Option<String>,
    pub active: bool,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

/// What `subscribe` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// First subscription for this email.
    Created(NewsletterSubscriber),
    /// A previously unsubscribed email was switched back on.
    Reactivated(NewsletterSubscriber),
    /// The email is already subscribed; nothing changed.
    AlreadyActive,
}

/// A message sent through the contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Validated contact form input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContactMessage {
    pub name: String,
    pub email: Email,
    pub subject: String,
    pub message: String,
}
