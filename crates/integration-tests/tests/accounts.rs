//! Registration, email verification and login against a running storefront.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`bricky-cli migrate`)
//! - The storefront running (`cargo run -p bricky-storefront`)
//! - `STOREFRONT_SECRET_KEY` matching the server's
//!
//! Run with: cargo test -p bricky-integration-tests -- --ignored

use bricky_integration_tests::{
    base_url, client, login, pool, register, unique_username, user, verification_path,
};
use reqwest::StatusCode;

// ============================================================================
// Registration & Verification
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_register_verify_login() {
    let pool = pool().await;
    let client = client();
    let username = unique_username();

    assert_eq!(register(&client, &username).await, StatusCode::OK);

    // Unverified accounts cannot log in
    let resp = login(&client, &username, "/").await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("/users/resend-verification"));

    let account = user(&pool, &username).await;
    assert!(!account.email_is_verified);

    let path = verification_path(&account);
    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to follow link");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(user(&pool, &username).await.email_is_verified);

    // Following the link again still lands on a success page
    let resp = client
        .get(format!("{}{path}", base_url()))
        .send()
        .await
        .expect("Failed to follow link");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("already verified"));

    let resp = login(&client, &username, "/orders").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get("location").and_then(|v| v.to_str().ok()),
        Some("/orders")
    );
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_duplicate_registration_rejected() {
    let client = client();
    let username = unique_username();

    assert_eq!(register(&client, &username).await, StatusCode::OK);
    assert_eq!(register(&client, &username).await, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_tampered_link_fails() {
    let pool = pool().await;
    let client = client();
    let username = unique_username();
    register(&client, &username).await;

    let path = verification_path(&user(&pool, &username).await);
    let tampered = format!("{}0", path.trim_end_matches(|c: char| c != '-'));
    let resp = client
        .get(format!("{}{tampered}", base_url()))
        .send()
        .await
        .expect("Failed to follow link");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!user(&pool, &username).await.email_is_verified);
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_wrong_password() {
    let client = client();
    let resp = client
        .post(format!("{}/users/login", base_url()))
        .form(&[("username", "nobody_here"), ("password", "wrong")])
        .send()
        .await
        .expect("Failed to post login");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = resp.text().await.expect("Failed to read response");
    assert!(body.contains("Invalid username or password."));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_resend_is_neutral() {
    let client = client();
    for email in ["nobody@example.com", "not-an-email"] {
        let resp = client
            .post(format!("{}/users/resend-verification", base_url()))
            .form(&[("email", email)])
            .send()
            .await
            .expect("Failed to post resend");
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
