//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use bricky_core::{Email, UserId, Username};

/// A storefront account.
#[derive(Debug, Clone)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// User's email address.
    pub email: Email,
    /// Optional contact phone.
    pub phone: Option<String>,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Whether the email has been verified.
    pub email_is_verified: bool,
    /// Disabled accounts cannot log in.
    pub is_active: bool,
    /// Last successful login.
    pub last_login: Option<DateTime<Utc>>,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}
