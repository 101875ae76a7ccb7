//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Registration and username/password login
//! - `verification` - Signed, expiring email verification links
//! - `email` - Transactional email (SMTP or console)
//! - `cart` - Cart mutations with stock checks
//! - `checkout` - Transactional order placement

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod verification;

pub use auth::{AuthError, AuthService};
pub use cart::{CartError, CartService};
pub use checkout::{CheckoutError, CheckoutService};
pub use email::{EmailError, EmailService};
pub use verification::VerificationTokens;
