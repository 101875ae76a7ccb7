//! Authentication service.
//!
//! Username/password accounts with argon2 hashes. New accounts start
//! unverified and cannot log in until the emailed link is followed.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use bricky_core::{Email, EmailError, Username};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, UserRepository};
use crate::forms::{FieldErrors, is_plausible_phone, non_blank};
use crate::models::User;

/// Raw registration form input.
#[derive(Debug, Default)]
pub struct RegistrationInput<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
    pub phone: Option<&'a str>,
}

/// Registration input that passed the stateless checks.
#[derive(Debug)]
pub struct Registration {
    pub username: Username,
    pub email: Email,
    pub password: String,
    pub phone: Option<String>,
}

/// Validate the registration form without touching the database.
///
/// # Errors
///
/// Returns every problem found, keyed by form field.
pub fn validate_registration(input: &RegistrationInput<'_>) -> Result<Registration, FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = Username::parse(input.username)
        .map_err(|e| errors.add("username", e.to_string()))
        .ok();

    let email = if input.email.trim().is_empty() {
        errors.add("email", "Email can't be empty.");
        None
    } else {
        Email::parse(input.email)
            .map_err(|_: EmailError| errors.add("email", "Please enter a valid email address."))
            .ok()
    };

    if input.password.is_empty() {
        errors.add("password", "Password can't be empty");
    }
    if input.confirm_password.is_empty() {
        errors.add("confirm_password", "Password confirmation can't be empty");
    }
    if !input.password.is_empty()
        && !input.confirm_password.is_empty()
        && input.password != input.confirm_password
    {
        errors.add("confirm_password", "Passwords do not match.");
    }

    let phone = non_blank(input.phone).map(str::to_owned);
    if let Some(phone) = &phone
        && !is_plausible_phone(phone)
    {
        errors.add("phone", "Enter a valid phone number (e.g. +12125552368).");
    }

    match (username, email) {
        (Some(username), Some(email)) if errors.is_empty() => Ok(Registration {
            username,
            email,
            password: input.password.to_owned(),
            phone,
        }),
        _ => Err(errors),
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Create an unverified account (and its customer profile).
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` when the username or email is taken.
    pub async fn register(&self, registration: &Registration) -> Result<User, AuthError> {
        let mut errors = FieldErrors::new();
        if self.users.username_taken(registration.username.as_str()).await? {
            errors.add("username", "This username is already taken.");
        }
        if self.users.email_taken(&registration.email).await? {
            errors.add("email", "This email is already registered.");
        }
        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }

        let password_hash = hash_password(&registration.password)?;

        // A concurrent registration can still win the race; the unique
        // constraints decide.
        self.users
            .create(&NewUser {
                username: &registration.username,
                email: &registration.email,
                phone: registration.phone.as_deref(),
                password_hash: &password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(field) if field == "username" => AuthError::Invalid(
                    FieldErrors::single("username", "This username is already taken."),
                ),
                RepositoryError::Conflict(_) => AuthError::Invalid(FieldErrors::single(
                    "email",
                    "This email is already registered.",
                )),
                other => AuthError::Repository(other),
            })
    }

    /// Login with username and password.
    ///
    /// The password is checked before the verification flag so the
    /// "not verified" answer never leaks whether an account exists.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Invalid` for blank fields,
    /// `AuthError::InvalidCredentials` if the username/password is wrong and
    /// `AuthError::EmailNotVerified` if the account is not verified yet.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let mut errors = FieldErrors::new();
        if username.trim().is_empty() {
            errors.add("username", "Username can't be empty.");
        }
        if password.is_empty() {
            errors.add("password", "Password can't be empty");
        }
        if !errors.is_empty() {
            return Err(AuthError::Invalid(errors));
        }

        let Some(user) = self.users.get_by_username(username.trim()).await? else {
            // Burn comparable time so response timing doesn't reveal the miss.
            let _ = hash_password(password);
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &user.password_hash)?;

        if !user.is_active {
            return Err(AuthError::InvalidCredentials);
        }
        if !user.email_is_verified {
            return Err(AuthError::EmailNotVerified);
        }

        self.users.touch_last_login(user.id).await?;
        Ok(user)
    }
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password doesn't match.
pub fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::PasswordHash)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input() -> RegistrationInput<'static> {
        RegistrationInput {
            username: "brickfan",
            email: "Fan@Bricky.Shop",
            password: "studs-and-tubes",
            confirm_password: "studs-and-tubes",
            phone: None,
        }
    }

    #[test]
    fn test_hash_and_verify_password() {
        let password = "test_password_123";
        let hash = hash_password(password).unwrap();

        assert!(verify_password(password, &hash).is_ok());
        assert!(matches!(
            verify_password("wrong_password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_valid_registration_normalizes_email() {
        let registration = validate_registration(&input()).unwrap();
        assert_eq!(registration.username.as_str(), "brickfan");
        assert_eq!(registration.email.as_str(), "fan@bricky.shop");
        assert_eq!(registration.phone, None);
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let errors = validate_registration(&RegistrationInput::default()).unwrap_err();
        assert_eq!(errors.first("username"), Some("Username can't be empty."));
        assert_eq!(errors.first("email"), Some("Email can't be empty."));
        assert_eq!(errors.first("password"), Some("Password can't be empty"));
        assert_eq!(
            errors.first("confirm_password"),
            Some("Password confirmation can't be empty")
        );
    }

    #[test]
    fn test_invalid_email_message() {
        let errors = validate_registration(&RegistrationInput {
            email: "not-an-email",
            ..input()
        })
        .unwrap_err();
        assert_eq!(errors.first("email"), Some("Please enter a valid email address."));
    }

    #[test]
    fn test_password_mismatch() {
        let errors = validate_registration(&RegistrationInput {
            confirm_password: "studs-and-tubez",
            ..input()
        })
        .unwrap_err();
        assert_eq!(errors.first("confirm_password"), Some("Passwords do not match."));
        assert!(!errors.has("password"));
    }

    #[test]
    fn test_optional_phone() {
        let registration = validate_registration(&RegistrationInput {
            phone: Some(" +1 (212) 555-2368 "),
            ..input()
        })
        .unwrap();
        assert_eq!(registration.phone.as_deref(), Some("+1 (212) 555-2368"));

        let errors = validate_registration(&RegistrationInput {
            phone: Some("call me"),
            ..input()
        })
        .unwrap_err();
        assert!(errors.has("phone"));

        assert!(validate_registration(&RegistrationInput {
            phone: Some("   "),
            ..input()
        })
        .is_ok());
    }
}
