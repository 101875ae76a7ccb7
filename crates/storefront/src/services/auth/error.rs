//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::forms::FieldErrors;

/// Errors that can occur during registration and login.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The submitted form failed validation.
    #[error("invalid form")]
    Invalid(FieldErrors),

    /// Wrong password, unknown username or disabled account.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The password was right but the email address is not verified yet.
    #[error("email not verified")]
    EmailNotVerified,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
