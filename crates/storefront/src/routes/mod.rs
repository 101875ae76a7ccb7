//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness
//! GET  /health/ready                - Readiness (database ping)
//!
//! # Catalog
//! GET  /                            - Product listing (filters, sort, pages)
//! GET  /search                      - Same listing, search box focused
//! GET  /categories/{slug}           - Listing restricted to one category
//! GET  /products/{slug}             - Product detail with reviews
//! GET  /api/autocomplete            - Product/category name suggestions (JSON)
//!
//! # Cart (JSON except the page; login required)
//! GET  /cart                        - Cart page
//! POST /cart/add                    - Add a product
//! POST /cart/update                 - Change a line's quantity
//! POST /cart/remove                 - Remove a line
//! POST /cart/clear                  - Empty the cart
//! GET  /cart/count                  - Units in cart (0 when anonymous)
//!
//! # Checkout (login required)
//! GET  /checkout                    - Delivery form and totals
//! POST /checkout                    - Place the order
//! GET  /orders                      - Order history
//! GET  /orders/{id}/confirmation    - Confirmation for one order
//!
//! # Reviews (JSON, login required)
//! POST /reviews                     - Submit a review for moderation
//! POST /reviews/{id}/helpful        - Helpful / unhelpful vote
//!
//! # Newsletter
//! POST /newsletter/subscribe        - Footer form (HTML fragment)
//! POST /api/newsletter/subscribe    - JSON subscribe
//! POST /api/newsletter/unsubscribe  - JSON unsubscribe
//!
//! # Contact
//! GET  /contact                     - Contact form
//! POST /contact                     - Store a message
//!
//! # Accounts
//! GET  /users/register              - Registration form
//! POST /users/register              - Create an unverified account
//! GET  /users/login                 - Login form
//! POST /users/login                 - Login action
//! POST /users/logout                - Logout action
//! GET  /users/verify-email/{uid}/{token} - Follow a verification link
//! GET  /users/resend-verification   - Request a new link
//! POST /users/resend-verification   - Send a new link
//!
//! # Static pages
//! GET  /privacy-policy, /terms-of-service, /cookie-settings
//! ```
//!
//! Form posts that check passwords or send email share one per-IP rate limit.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod contact;
pub mod newsletter;
pub mod pages;
pub mod products;
pub mod reviews;

use std::convert::Infallible;

use axum::{
    Router,
    extract::{FromRequestParts, State},
    handler::Handler,
    http::{StatusCode, request::Parts},
    middleware as axum_middleware,
    routing::{MethodRouter, get, post},
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions::Session;

use crate::middleware::{
    self, create_session_layer, form_rate_limiter, rate_limit::RateLimiterLayer,
    request_id_middleware, security_headers_middleware,
};
use crate::models::{CurrentUser, Flash, session_keys};
use crate::state::AppState;

/// Chrome every full page renders: who is logged in and the pending notice.
///
/// Extracting it consumes the flash message, so only page handlers should
/// ask for it.
#[derive(Debug, Clone, Default)]
pub struct PageContext {
    pub current_user: Option<CurrentUser>,
    pub flash: Option<Flash>,
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self::default());
        };

        let current_user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let flash = middleware::take_flash(session).await;

        Ok(Self {
            current_user,
            flash,
        })
    }
}

/// POST route behind the shared form rate limit.
fn limited<H, T>(handler: H, limiter: &RateLimiterLayer) -> MethodRouter<AppState>
where
    H: Handler<T, AppState>,
    T: 'static,
{
    post(handler).layer(limiter.clone())
}

/// Create the account routes router.
fn user_routes(limiter: &RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .route(
            "/register",
            get(auth::register_page).merge(limited(auth::register, limiter)),
        )
        .route(
            "/login",
            get(auth::login_page).merge(limited(auth::login, limiter)),
        )
        .route("/logout", post(auth::logout))
        .route("/verify-email/{uidb64}/{token}", get(auth::verify_email))
        .route(
            "/resend-verification",
            get(auth::resend_page).merge(limited(auth::resend_verification, limiter)),
        )
}

/// Create the cart routes router.
fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the JSON API routes router.
fn api_routes(limiter: &RateLimiterLayer) -> Router<AppState> {
    Router::new()
        .route("/autocomplete", get(products::autocomplete))
        .route(
            "/newsletter/subscribe",
            limited(newsletter::api_subscribe, limiter),
        )
        .route(
            "/newsletter/unsubscribe",
            limited(newsletter::api_unsubscribe, limiter),
        )
}

/// Create all page and API routes for the storefront.
pub fn routes() -> Router<AppState> {
    let limiter = form_rate_limiter();

    Router::new()
        // Catalog
        .route("/", get(catalog::index))
        .route("/search", get(catalog::search))
        .route("/categories/{slug}", get(catalog::category))
        .route("/products/{slug}", get(products::show))
        // Cart
        .nest("/cart", cart_routes())
        // Checkout and orders
        .route("/checkout", get(checkout::show).post(checkout::place))
        .route("/orders", get(checkout::history))
        .route("/orders/{id}/confirmation", get(checkout::confirmation))
        // Reviews
        .route("/reviews", post(reviews::create))
        .route("/reviews/{id}/helpful", post(reviews::vote))
        // Newsletter and contact
        .route(
            "/newsletter/subscribe",
            limited(newsletter::subscribe, &limiter),
        )
        .route(
            "/contact",
            get(contact::show).merge(limited(contact::submit, &limiter)),
        )
        // Accounts
        .nest("/users", user_routes(&limiter))
        // Static pages
        .route("/privacy-policy", get(pages::privacy_policy))
        .route("/terms-of-service", get(pages::terms_of_service))
        .route("/cookie-settings", get(pages::cookie_settings))
        .nest("/api", api_routes(&limiter))
}

/// The full application: routes, health checks, static files and the
/// per-request middleware, bound to `state`.
///
/// Sentry layers are added by the binary so tests never need a client.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.pool(), state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new("crates/storefront/static"))
        .nest_service("/media", ServeDir::new("crates/storefront/media"))
        .layer(session_layer)
        .layer(axum_middleware::from_fn(security_headers_middleware))
        .layer(axum_middleware::from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{Request, header},
        response::Response,
    };
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    use super::*;
    use crate::config::{EmailConfig, StorefrontConfig};
    use crate::services::EmailService;

    /// State over a pool that never connects; routes that stay off the
    /// database can be exercised without one.
    pub(crate) fn test_state() -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://bricky@127.0.0.1:1/bricky"),
            host: "127.0.0.1".parse().unwrap(),
            port: 8000,
            base_url: "http://localhost:8000".to_string(),
            secret_key: SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6e"),
            verification_ttl: Duration::from_secs(86_400),
            email: EmailConfig::console(),
            sentry_dsn: None,
            sentry_environment: None,
        };
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://bricky@127.0.0.1:1/bricky")
            .unwrap();
        AppState::with_email(config, pool, EmailService::console("noreply@bricky.shop"))
    }

    pub(crate) async fn send(request: Request<Body>) -> Response {
        app(test_state()).oneshot(request).await.unwrap()
    }

    pub(crate) async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn form_post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("x-forwarded-for", "203.0.113.10")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = send(get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn test_readiness_without_database() {
        let response = send(get("/health/ready")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_security_headers_and_request_id() {
        let response = send(get("/health")).await;
        let headers = response.headers();
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert!(headers.get("content-security-policy").is_some());
        assert!(headers.get("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let response = send(get("/no-such-page")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_anonymous_cart_mutations_are_401_json() {
        for uri in ["/cart/add", "/cart/update", "/cart/remove", "/cart/clear"] {
            let response = send(form_post(uri, "product_id=1&quantity=1&item_id=1")).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
            let body: serde_json::Value =
                serde_json::from_str(&body_string(response).await).unwrap();
            assert_eq!(body["success"], false, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_anonymous_cart_page_redirect_keeps_full_path() {
        let response = send(get("/cart")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/users/login?next=%2Fcart"
        );
    }

    #[tokio::test]
    async fn test_anonymous_cart_count_is_zero() {
        let response = send(get("/cart/count")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body, serde_json::json!({ "cart_count": 0 }));
    }

    #[tokio::test]
    async fn test_anonymous_checkout_redirects_to_login() {
        let response = send(get("/checkout")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/users/login?next=%2Fcheckout"
        );
    }

    #[tokio::test]
    async fn test_anonymous_review_is_401() {
        let response = send(form_post("/reviews", "product_id=x&rating=5")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_static_pages_render() {
        for uri in ["/privacy-policy", "/terms-of-service", "/cookie-settings"] {
            let response = send(get(uri)).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(body_string(response).await.contains("Bricky"), "{uri}");
        }
    }

    #[tokio::test]
    async fn test_account_forms_render() {
        for uri in ["/users/login", "/users/register", "/users/resend-verification", "/contact"] {
            let response = send(get(uri)).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_malformed_verification_link_is_400() {
        let response = send(get("/users/verify-email/%21%21%21/1-abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("resend"));
    }

    #[tokio::test]
    async fn test_short_autocomplete_query_is_empty() {
        let response = send(get("/api/autocomplete?q=b")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "suggestions": { "products": [], "categories": [] } })
        );
    }

    #[tokio::test]
    async fn test_invalid_newsletter_email_is_400() {
        let response = send(form_post("/api/newsletter/subscribe", "email=not-an-email")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_form_burst_is_rate_limited_with_json_body() {
        let router = app(test_state());
        let mut statuses = Vec::new();
        for _ in 0..6 {
            let response = router
                .clone()
                .oneshot(form_post("/api/newsletter/subscribe", "email=nope"))
                .await
                .unwrap();
            statuses.push(response.status());
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let body: serde_json::Value =
                    serde_json::from_str(&body_string(response).await).unwrap();
                assert_eq!(body["success"], false);
            }
        }
        assert_eq!(statuses[..5], [StatusCode::BAD_REQUEST; 5]);
        assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_contact_validation_rerenders_form() {
        let response = send(form_post("/contact", "name=&email=bad&subject=general&message=")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("Please enter a valid email address."));
    }

    #[tokio::test]
    async fn test_register_validation_rerenders_form() {
        let response = send(form_post(
            "/users/register",
            "username=&email=&password=a&confirm_password=b",
        ))
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("Email can&#x27;t be empty.") || body.contains("Email can&#39;t be empty."));
        assert!(body.contains("Passwords do not match."));
    }
}
