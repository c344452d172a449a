//! Core types for Joestar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod money;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use money::{MAX_AMOUNT, percent_of, round_currency, within_amount_range};
pub use status::*;
