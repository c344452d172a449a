//! Domain models owned by the API.
//!
//! Money rules and catalog types live in `joestar-core`; these are the
//! records that are only ever stored and listed.

pub mod engagement;
pub mod user;

pub use engagement::{
    ContactMessage, Ebook, NewContactMessage, NewTestimonial, NewsletterSubscriber,
    SubscribeOutcome, Testimonial,
};
pub use user::{NewUser, User, UserProfile, UserSummary};
