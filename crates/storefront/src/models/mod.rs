//! Domain models for the storefront.
//!
//! Row-shaped structs derive `sqlx::FromRow` directly where every column maps
//! onto a checked type; accounts go through a row type in `db::users` so that
//! usernames and emails are re-validated on the way out.

pub mod cart;
pub mod catalog;
pub mod contact;
pub mod newsletter;
pub mod order;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{CartLine, CartSummary};
pub use catalog::{Category, Page, PriceRange, Product, ProductCard, clamp_page};
pub use contact::{ContactMessage, NewContactMessage};
pub use newsletter::Subscription;
pub use order::{Customer, Order, OrderElement};
pub use review::{RatingSummary, Review};
pub use session::{CurrentUser, Flash, FlashLevel, keys as session_keys};
pub use user::User;
