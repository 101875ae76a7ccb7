//! Cart route handlers.
//!
//! The cart page is server-rendered; every mutation is a small form POST
//! answered with JSON so `storefront.js` can patch the page in place.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bricky_core::{CartItemId, ProductId};

use super::PageContext;
use crate::error::{ApiError, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::CartSummary;
use crate::services::{CartError, CartService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: String,
    pub quantity: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub cart_item_id: String,
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub cart_item_id: String,
}

fn parse_item_id(raw: &str) -> std::result::Result<CartItemId, CartError> {
    raw.trim()
        .parse::<i32>()
        .map(CartItemId::new)
        .map_err(|_| CartError::ItemNotFound)
}

fn parse_quantity(raw: &str) -> std::result::Result<i32, CartError> {
    raw.trim().parse::<i32>().map_err(|_| CartError::InvalidQuantity)
}

// =============================================================================
// Response Types
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartChanged {
    pub success: bool,
    pub message: String,
    pub cart_count: i64,
    pub cart_total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct QuantityChanged {
    pub success: bool,
    pub item_total: Decimal,
    pub cart_total: Decimal,
    pub cart_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CartCleared {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CartCount {
    pub cart_count: i64,
}

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub page: PageContext,
    pub cart: CartSummary,
}

// =============================================================================
// Handlers
// =============================================================================

/// Display the cart page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let cart = CartService::new(state.pool()).summary(user.id).await?;
    Ok(CartTemplate { page, cart })
}

/// Add a product to the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<AddToCartForm>,
) -> std::result::Result<Json<CartChanged>, ApiError> {
    let product_id = form
        .product_id
        .trim()
        .parse::<ProductId>()
        .map_err(|_| CartError::ProductNotFound)?;
    let quantity = match form.quantity.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_quantity(raw)?,
        _ => 1,
    };

    let added = CartService::new(state.pool())
        .add(user.id, product_id, quantity)
        .await?;

    Ok(Json(CartChanged {
        success: true,
        message: format!("{} added to cart.", added.product_name),
        cart_count: added.summary.count,
        cart_total: added.summary.totals.total,
    }))
}

/// Change a line's quantity; zero removes it.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<UpdateCartForm>,
) -> std::result::Result<Json<QuantityChanged>, ApiError> {
    let item_id = parse_item_id(&form.cart_item_id)?;
    let quantity = parse_quantity(&form.quantity)?;

    let updated = CartService::new(state.pool())
        .update(user.id, item_id, quantity)
        .await?;

    Ok(Json(QuantityChanged {
        success: true,
        item_total: updated.item_total,
        cart_total: updated.summary.totals.total,
        cart_count: updated.summary.count,
    }))
}

/// Remove one line.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<RemoveFromCartForm>,
) -> std::result::Result<Json<CartChanged>, ApiError> {
    let item_id = parse_item_id(&form.cart_item_id)?;
    let summary = CartService::new(state.pool()).remove(user.id, item_id).await?;

    Ok(Json(CartChanged {
        success: true,
        message: "Item removed from cart.".to_string(),
        cart_count: summary.count,
        cart_total: summary.totals.total,
    }))
}

/// Empty the cart.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> std::result::Result<Json<CartCleared>, ApiError> {
    CartService::new(state.pool()).clear(user.id).await?;
    Ok(Json(CartCleared {
        success: true,
        message: "Cart cleared.",
    }))
}

/// Units in the cart; anonymous visitors always have zero.
pub async fn count(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
) -> std::result::Result<Json<CartCount>, ApiError> {
    let cart_count = match user {
        Some(user) => CartService::new(state.pool()).count(user.id).await?,
        None => 0,
    };
    Ok(Json(CartCount { cart_count }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_id() {
        assert_eq!(parse_item_id(" 42 ").ok(), Some(CartItemId::new(42)));
        assert!(matches!(parse_item_id("abc"), Err(CartError::ItemNotFound)));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("3").ok(), Some(3));
        assert!(matches!(parse_quantity("three"), Err(CartError::InvalidQuantity)));
    }

    #[test]
    fn test_count_json_shape() {
        let value = serde_json::to_value(CartCount { cart_count: 4 }).unwrap_or_default();
        assert_eq!(value, serde_json::json!({ "cart_count": 4 }));
    }
}
