//! Checkout, order confirmation and order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bricky_core::OrderId;

use super::PageContext;
use crate::db::{CustomerRepository, OrderRepository};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::FieldErrors;
use crate::middleware::{RequireAuth, flash};
use crate::models::{CartSummary, CurrentUser, FlashLevel, Order, OrderElement};
use crate::services::checkout::{PlacedOrder, validate_delivery};
use crate::services::{CartService, CheckoutError, CheckoutService};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Checkout form data.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
    pub order_note: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub page: PageContext,
    pub cart: CartSummary,
    pub form: CheckoutForm,
    pub errors: FieldErrors,
    /// Problem with the order as a whole, e.g. a product sold out.
    pub error: Option<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub page: PageContext,
    pub order: Order,
    pub elements: Vec<OrderElement>,
}

/// Order history page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/orders.html")]
pub struct OrdersTemplate {
    pub page: PageContext,
    pub orders: Vec<Order>,
}

// =============================================================================
// Checkout Routes
// =============================================================================

/// Display the checkout form, prefilled from the customer profile.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    page: PageContext,
) -> Result<Response> {
    let cart = CartService::new(state.pool()).summary(user.id).await?;
    if cart.is_empty() {
        flash(&session, FlashLevel::Info, "Your cart is empty.").await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let customer = CustomerRepository::new(state.pool())
        .get_or_create(user.id)
        .await?;

    Ok(CheckoutTemplate {
        page,
        cart,
        form: CheckoutForm {
            address: customer.address,
            phone: customer.phone,
            order_note: None,
        },
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response())
}

/// Place the order and redirect to its confirmation page.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    page: PageContext,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let details = match validate_delivery(
        &form.address,
        form.phone.as_deref(),
        form.order_note.as_deref(),
    ) {
        Ok(details) => details,
        Err(errors) => return rerender(&state, &user, page, form, errors, None).await,
    };

    let placed = match CheckoutService::new(state.pool())
        .place_order(user.id, &details)
        .await
    {
        Ok(placed) => placed,
        Err(CheckoutError::EmptyCart) => {
            flash(&session, FlashLevel::Info, "Your cart is empty.").await;
            return Ok(Redirect::to("/cart").into_response());
        }
        Err(CheckoutError::Invalid(errors)) => {
            return rerender(&state, &user, page, form, errors, None).await;
        }
        Err(
            err @ (CheckoutError::Unavailable { .. } | CheckoutError::InsufficientStock { .. }),
        ) => {
            let message = err.to_string();
            return rerender(&state, &user, page, form, FieldErrors::new(), Some(message)).await;
        }
        Err(err) => return Err(err.into()),
    };

    send_confirmation(&state, &user, &placed).await;

    flash(
        &session,
        FlashLevel::Success,
        "Thank you! Your order has been placed.",
    )
    .await;
    Ok(Redirect::to(&format!("/orders/{}/confirmation", placed.order.id)).into_response())
}

/// Show the form again with what went wrong.
async fn rerender(
    state: &AppState,
    user: &CurrentUser,
    page: PageContext,
    form: CheckoutForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Result<Response> {
    let cart = CartService::new(state.pool()).summary(user.id).await?;
    let template = CheckoutTemplate {
        page,
        cart,
        form,
        errors,
        error,
    };
    Ok((StatusCode::BAD_REQUEST, template).into_response())
}

/// Email the order summary. The order is already committed, so a failure
/// is only logged.
async fn send_confirmation(state: &AppState, user: &CurrentUser, placed: &PlacedOrder) {
    let order_url = format!(
        "{}/orders/{}/confirmation",
        state.config().base_url,
        placed.order.id
    );
    if let Err(e) = state
        .email()
        .send_order_confirmation(
            user.email.as_str(),
            &user.username,
            &placed.order,
            &placed.elements,
            &order_url,
        )
        .await
    {
        tracing::warn!(error = %e, order_id = %placed.order.id, "Failed to send order confirmation");
    }
}

// =============================================================================
// Order Routes
// =============================================================================

/// Confirmation page for one of the user's orders.
#[instrument(skip_all, fields(user_id = %user.id, order_id = %id))]
pub async fn confirmation(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let not_found = || AppError::NotFound("Order not found.".to_string());
    let order_id = id.parse::<i32>().map(OrderId::new).map_err(|_| not_found())?;

    let orders = OrderRepository::new(state.pool());
    let order = orders
        .get_for_user(order_id, user.id)
        .await?
        .ok_or_else(not_found)?;
    let elements = orders.elements(order.id).await?;

    Ok(ConfirmationTemplate {
        page,
        order,
        elements,
    })
}

/// The user's placed orders.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn history(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<impl IntoResponse> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(OrdersTemplate { page, orders })
}
