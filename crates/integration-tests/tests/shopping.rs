//! Cart, checkout and reviews against a running storefront.
//!
//! Run with: cargo test -p bricky-integration-tests -- --ignored

use bricky_integration_tests::{base_url, logged_in_client, pool, product};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::Value;

async fn json(resp: reqwest::Response) -> Value {
    resp.json().await.expect("Failed to parse JSON")
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_cart_add_update_remove() {
    let pool = pool().await;
    let (client, _) = logged_in_client(&pool).await;
    let item = product(&pool, Decimal::new(250, 2), 5).await;
    let base = base_url();

    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", item.id.to_string()), ("quantity", "2".to_string())])
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["cart_count"], 2);

    // More than in stock
    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", item.id.to_string()), ("quantity", "10".to_string())])
        .send()
        .await
        .expect("Failed to add to cart");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let count = json(
        client
            .get(format!("{base}/cart/count"))
            .send()
            .await
            .expect("Failed to get count"),
    )
    .await;
    assert_eq!(count["cart_count"], 2);

    let page = client
        .get(format!("{base}/cart"))
        .send()
        .await
        .expect("Failed to get cart")
        .text()
        .await
        .expect("Failed to read cart");
    assert!(page.contains(&item.name));

    let resp = client
        .post(format!("{base}/cart/clear"))
        .send()
        .await
        .expect("Failed to clear cart");
    assert_eq!(json(resp).await["message"], "Cart cleared.");
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_checkout_places_order() {
    let pool = pool().await;
    let (client, _) = logged_in_client(&pool).await;
    let item = product(&pool, Decimal::new(1000, 2), 3).await;
    let base = base_url();

    // Empty cart redirects back to the cart
    let resp = client
        .get(format!("{base}/checkout"))
        .send()
        .await
        .expect("Failed to get checkout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", item.id.to_string()), ("quantity", "3".to_string())])
        .send()
        .await
        .expect("Failed to add to cart");

    // Missing address re-renders the form
    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[("address", "")])
        .send()
        .await
        .expect("Failed to post checkout");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[("address", "1 Brick Lane, Springfield"), ("order_note", "Ring twice")])
        .send()
        .await
        .expect("Failed to post checkout");
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Missing location")
        .to_string();
    assert!(location.starts_with("/orders/") && location.ends_with("/confirmation"));

    let page = client
        .get(format!("{base}{location}"))
        .send()
        .await
        .expect("Failed to get confirmation")
        .text()
        .await
        .expect("Failed to read confirmation");
    assert!(page.contains(&item.name));
    assert!(page.contains("1 Brick Lane"));

    // Stock was taken and the cart emptied
    let stock: i32 = sqlx::query_scalar("SELECT stock FROM storefront.products WHERE id = $1")
        .bind(item.id)
        .fetch_one(&pool)
        .await
        .expect("Failed to read stock");
    assert_eq!(stock, 0);
    let count = json(
        client
            .get(format!("{base}/cart/count"))
            .send()
            .await
            .expect("Failed to get count"),
    )
    .await;
    assert_eq!(count["cart_count"], 0);
}

// ============================================================================
// Reviews
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_review_once_per_product() {
    let pool = pool().await;
    let (client, _) = logged_in_client(&pool).await;
    let item = product(&pool, Decimal::new(99, 2), 10).await;
    let base = base_url();

    let form = [
        ("product_id", item.id.to_string()),
        ("rating", "5".to_string()),
        ("title", "Great clutch".to_string()),
        ("content", "Snaps together perfectly.".to_string()),
    ];

    let resp = client
        .post(format!("{base}/reviews"))
        .form(&form)
        .send()
        .await
        .expect("Failed to post review");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = json(resp).await;
    assert_eq!(body["review"]["rating"], 5);

    let resp = client
        .post(format!("{base}/reviews"))
        .form(&form)
        .send()
        .await
        .expect("Failed to post review");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json(resp).await["message"],
        "You have already reviewed this product."
    );

    // Pending reviews are not shown
    let page = client
        .get(format!("{base}/products/{}", item.slug))
        .send()
        .await
        .expect("Failed to get product")
        .text()
        .await
        .expect("Failed to read product");
    assert!(!page.contains("Snaps together perfectly."));
}

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_vote_on_unknown_review_is_404_before_action_check() {
    let pool = pool().await;
    let (client, _) = logged_in_client(&pool).await;
    let base = base_url();

    let resp = client
        .post(format!("{base}/reviews/2147483000/helpful"))
        .form(&[("action", "bogus")])
        .send()
        .await
        .expect("Failed to post vote");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(json(resp).await["message"], "Review not found.");
}

// ============================================================================
// Newsletter
// ============================================================================

#[tokio::test]
#[ignore = "Requires running storefront and database"]
async fn test_newsletter_subscribe_twice() {
    let client = bricky_integration_tests::client();
    let email = format!("{}@example.com", bricky_integration_tests::unique_username());
    let base = base_url();

    for expected in ["Thanks for subscribing!", "You're already subscribed."] {
        let resp = client
            .post(format!("{base}/api/newsletter/subscribe"))
            .form(&[("email", &email)])
            .send()
            .await
            .expect("Failed to subscribe");
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json(resp).await["message"], expected);
    }

    let resp = client
        .post(format!("{base}/api/newsletter/unsubscribe"))
        .form(&[("email", &email)])
        .send()
        .await
        .expect("Failed to unsubscribe");
    assert_eq!(resp.status(), StatusCode::OK);
}
