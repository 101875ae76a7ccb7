//! Bricky Core - Shared domain types.
//!
//! This crate provides the types used across the Bricky workspace:
//! - `storefront` - Public-facing brick shop (catalog, cart, checkout, accounts)
//! - `cli` - Command-line tools for migrations, seeding and user maintenance
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, slugs, usernames, prices and statuses
//! - [`pricing`] - Cart and order total arithmetic (shipping, tax, rounding)

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use pricing::{OrderTotals, line_total};
pub use types::*;
