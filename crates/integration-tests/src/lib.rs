//! Integration tests for Bricky.
//!
//! # Running Tests
//!
//! ```bash
//! # Migrate and start the storefront against a scratch database
//! cargo run -p bricky-cli -- migrate
//! cargo run -p bricky-storefront
//!
//! # Run the ignored tests against it
//! cargo test -p bricky-integration-tests -- --ignored
//! ```
//!
//! The tests talk HTTP to `STOREFRONT_BASE_URL` and reach into
//! `STOREFRONT_DATABASE_URL` for setup that has no HTTP surface (catalog
//! rows, verification tokens). `STOREFRONT_SECRET_KEY` must match the
//! running server's.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode, redirect};
use rust_decimal::Decimal;
use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use bricky_core::Slug;
use bricky_storefront::db::products::ProductInput;
use bricky_storefront::db::{CategoryRepository, ProductRepository, UserRepository};
use bricky_storefront::models::{Product, User};
use bricky_storefront::services::VerificationTokens;

/// Password used for every test account.
pub const PASSWORD: &str = "Brick-by-brick-2026";

/// Base URL of the running storefront.
#[must_use]
pub fn base_url() -> String {
    let _ = dotenvy::dotenv();
    std::env::var("STOREFRONT_BASE_URL")
        .unwrap_or_else(|_| "http://localhost:8000".to_string())
        .trim_end_matches('/')
        .to_string()
}

/// A client that keeps cookies and does not follow redirects, so tests can
/// assert on `Location`.
///
/// Each client claims its own `X-Forwarded-For` address so the per-IP form
/// rate limit does not leak between tests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    let octets = Uuid::new_v4().into_bytes();
    let ip = format!("10.{}.{}.{}", octets[0], octets[1], octets[2]);
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&ip).expect("valid header value"),
    );

    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Connect to the storefront database.
///
/// # Panics
///
/// Panics if the database URL is missing or unreachable.
pub async fn pool() -> PgPool {
    let _ = dotenvy::dotenv();
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL not set");
    bricky_storefront::db::create_pool(&SecretString::from(url))
        .await
        .expect("Failed to connect to database")
}

/// Token generator keyed like the server.
///
/// # Panics
///
/// Panics if `STOREFRONT_SECRET_KEY` is not set.
#[must_use]
pub fn tokens() -> VerificationTokens {
    let secret = std::env::var("STOREFRONT_SECRET_KEY").expect("STOREFRONT_SECRET_KEY not set");
    VerificationTokens::new(SecretString::from(secret), Duration::from_secs(24 * 3600))
}

/// A username nobody has registered yet.
#[must_use]
pub fn unique_username() -> String {
    format!("it_{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// Register through the form. Returns the response status.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn register(client: &Client, username: &str) -> StatusCode {
    client
        .post(format!("{}/users/register", base_url()))
        .form(&[
            ("username", username),
            ("email", &format!("{username}@example.com")),
            ("password", PASSWORD),
            ("confirm_password", PASSWORD),
        ])
        .send()
        .await
        .expect("Failed to register")
        .status()
}

/// Load a user by name.
///
/// # Panics
///
/// Panics if the user does not exist.
pub async fn user(pool: &PgPool, username: &str) -> User {
    UserRepository::new(pool)
        .get_by_username(username)
        .await
        .expect("Failed to load user")
        .expect("User not found")
}

/// Verification link path (no host) for `user`.
#[must_use]
pub fn verification_path(user: &User) -> String {
    tokens().link_for("", user, Utc::now())
}

/// Log in through the form. Returns the response.
///
/// # Panics
///
/// Panics if the request fails.
pub async fn login(client: &Client, username: &str, next: &str) -> reqwest::Response {
    client
        .post(format!("{}/users/login", base_url()))
        .form(&[("username", username), ("password", PASSWORD), ("next", next)])
        .send()
        .await
        .expect("Failed to log in")
}

/// Register, verify and log in a fresh account.
///
/// # Panics
///
/// Panics if any step fails.
pub async fn logged_in_client(pool: &PgPool) -> (Client, String) {
    let client = client();
    let username = unique_username();
    assert_eq!(register(&client, &username).await, StatusCode::OK);
    UserRepository::new(pool)
        .mark_verified(user(pool, &username).await.id)
        .await
        .expect("Failed to verify user");
    let resp = login(&client, &username, "/").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    (client, username)
}

/// Create an active product with `stock` units in a throwaway category.
///
/// # Panics
///
/// Panics if the rows cannot be written.
pub async fn product(pool: &PgPool, price: Decimal, stock: i32) -> Product {
    let suffix = Uuid::new_v4().simple().to_string();
    let category_slug = Slug::parse(&format!("it-{}", &suffix[..8])).expect("valid slug");
    let category = CategoryRepository::new(pool)
        .upsert(&format!("Test {}", &suffix[..8]), &category_slug, None)
        .await
        .expect("Failed to create category");

    let slug = Slug::parse(&format!("it-brick-{}", &suffix[..12])).expect("valid slug");
    ProductRepository::new(pool)
        .upsert(&ProductInput {
            name: &format!("Test Brick {}", &suffix[..12]),
            slug: &slug,
            description: "Integration test brick.",
            picture: None,
            price,
            stock,
            category_id: category.id,
            is_active: true,
        })
        .await
        .expect("Failed to create product")
}
