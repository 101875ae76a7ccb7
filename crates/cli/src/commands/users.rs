//! Account maintenance and verification-link debugging.
//!
//! # Usage
//!
//! ```bash
//! # Print a fresh verification link without sending it
//! bricky-cli users verification-link alice
//!
//! # Explain why a link from an email does (not) verify
//! bricky-cli users check-link <uidb64> <token>
//!
//! # Email a new link
//! bricky-cli users resend-verification alice
//!
//! # Mark every account verified (local development)
//! bricky-cli users verify-all
//! ```
//!
//! The link commands need the same `STOREFRONT_*` variables as the server,
//! since tokens are keyed with `STOREFRONT_SECRET_KEY`.

use chrono::Utc;
use sqlx::PgPool;
use tracing::info;

use bricky_storefront::config::StorefrontConfig;
use bricky_storefront::db::UserRepository;
use bricky_storefront::models::User;
use bricky_storefront::services::verification::{decode_uid, token_issued_at};
use bricky_storefront::services::{EmailService, VerificationTokens};

use super::{CliError, connect};

fn tokens(config: &StorefrontConfig) -> VerificationTokens {
    VerificationTokens::new(config.secret_key.clone(), config.verification_ttl)
}

async fn find_user(pool: &PgPool, username: &str) -> Result<User, CliError> {
    UserRepository::new(pool)
        .get_by_username(username)
        .await?
        .ok_or_else(|| CliError::UserNotFound(username.to_string()))
}

/// List every account with its verification state.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn list() -> Result<(), CliError> {
    let pool = connect().await?;
    let users = UserRepository::new(&pool).list().await?;

    info!("{} users", users.len());
    for user in users {
        info!(
            "  {} <{}> verified={} active={} joined={}",
            user.username,
            user.email,
            user.email_is_verified,
            user.is_active,
            user.date_joined.format("%Y-%m-%d")
        );
    }
    Ok(())
}

/// Print a verification link for `username`.
///
/// # Errors
///
/// Returns an error if configuration is missing or the user does not exist.
pub async fn verification_link(username: &str) -> Result<(), CliError> {
    let config = StorefrontConfig::from_env()?;
    let pool = connect().await?;
    let user = find_user(&pool, username).await?;

    if user.email_is_verified {
        info!("{} is already verified", user.username);
    }
    let link = tokens(&config).link_for(&config.base_url, &user, Utc::now());
    info!("Verification link for {}: {link}", user.username);
    Ok(())
}

/// Diagnose a verification link.
///
/// # Errors
///
/// Returns an error if configuration is missing or the database is unreachable.
pub async fn check_link(uidb64: &str, token: &str) -> Result<(), CliError> {
    let config = StorefrontConfig::from_env()?;

    let Some(user_id) = decode_uid(uidb64) else {
        info!("uid {uidb64:?} does not decode to a user id");
        return Ok(());
    };
    info!("uid decodes to {user_id}");

    match token_issued_at(token) {
        Some(issued) => info!("token issued at {issued}"),
        None => info!("token timestamp is malformed"),
    }

    let pool = connect().await?;
    let Some(user) = UserRepository::new(&pool).get_by_id(user_id).await? else {
        info!("no user with id {user_id}");
        return Ok(());
    };
    info!("user: {} <{}>", user.username, user.email);

    if user.email_is_verified {
        info!("already verified; the link will show the success page");
        return Ok(());
    }

    if tokens(&config).check_token(&user, token, Utc::now()) {
        info!("token is VALID");
    } else {
        info!(
            "token is INVALID (expired after {}h, already used, or the account changed since it was issued)",
            config.verification_ttl.as_secs() / 3600
        );
    }
    Ok(())
}

/// Email a fresh verification link to `username`.
///
/// # Errors
///
/// Returns an error if configuration is missing, the user does not exist,
/// or the email fails to send.
pub async fn resend_verification(username: &str) -> Result<(), CliError> {
    let config = StorefrontConfig::from_env()?;
    let email =
        EmailService::new(&config.email).map_err(|e| CliError::EmailSetup(e.to_string()))?;
    let pool = connect().await?;
    let user = find_user(&pool, username).await?;

    if user.email_is_verified {
        return Err(CliError::Invalid(format!(
            "{} is already verified",
            user.username
        )));
    }

    let link = tokens(&config).link_for(&config.base_url, &user, Utc::now());
    email
        .send_verification_email(user.email.as_str(), user.username.as_str(), &link)
        .await?;
    info!("Verification email sent to {}", user.email);
    Ok(())
}

/// Mark every unverified account verified.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn verify_all() -> Result<(), CliError> {
    let pool = connect().await?;
    let changed = UserRepository::new(&pool).verify_all().await?;
    info!("Verified {changed} accounts");
    Ok(())
}
