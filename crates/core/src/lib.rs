//! Joestar Core - Domain types and business rules.
//!
//! This crate provides the types and pure rules shared by the Joestar
//! Peptide components:
//! - `api` - The JSON REST service
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP. Every rule that decides money (discounts, commissions, order
//! totals) lives here so it can be tested without a store.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, money helpers and status enums
//! - [`discount`] - Discount code evaluation
//! - [`affiliate`] - Commission crediting and tier progression
//! - [`catalog`] - Products and catalog filtering
//! - [`order`] - Order lines and totals
//! - [`wishlist`] - Ordered wishlist set

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod affiliate;
pub mod catalog;
pub mod discount;
pub mod order;
pub mod types;
pub mod wishlist;

pub use types::*;
