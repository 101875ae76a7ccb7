//! Order placement.
//!
//! One transaction turns the user's cart into an order: the products behind
//! the cart are locked, re-checked, snapshotted into order elements and their
//! stock decremented before the cart is emptied. Any failure rolls everything
//! back.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bricky_core::{OrderTotals, UserId};

use crate::db::orders::NewOrder;
use crate::db::{CartRepository, RepositoryError, carts, customers, orders, products};
use crate::forms::{FieldErrors, is_plausible_phone, non_blank};
use crate::models::{Order, OrderElement};

const MAX_ADDRESS_LENGTH: usize = 500;
const MAX_NOTE_LENGTH: usize = 200;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Please fix the errors below.")]
    Invalid(FieldErrors),

    #[error("{product_name} is no longer available.")]
    Unavailable { product_name: String },

    #[error("Only {available} of {product_name} left in stock.")]
    InsufficientStock { product_name: String, available: i32 },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for CheckoutError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Validated checkout form.
#[derive(Debug, Clone)]
pub struct DeliveryDetails {
    pub address: String,
    pub phone: Option<String>,
    pub order_note: String,
}

/// Validate the checkout form.
///
/// # Errors
///
/// Returns the problems found, keyed by form field.
pub fn validate_delivery(
    address: &str,
    phone: Option<&str>,
    order_note: Option<&str>,
) -> Result<DeliveryDetails, FieldErrors> {
    let mut errors = FieldErrors::new();

    let address = address.trim();
    if address.is_empty() {
        errors.add("address", "Please enter a delivery address.");
    } else if address.chars().count() > MAX_ADDRESS_LENGTH {
        errors.add(
            "address",
            format!("Address must be at most {MAX_ADDRESS_LENGTH} characters."),
        );
    }

    let phone = non_blank(phone);
    if phone.is_some_and(|p| !is_plausible_phone(p)) {
        errors.add("phone", "Please enter a valid phone number.");
    }

    let order_note = non_blank(order_note).unwrap_or_default();
    if order_note.chars().count() > MAX_NOTE_LENGTH {
        errors.add(
            "order_note",
            format!("Order note must be at most {MAX_NOTE_LENGTH} characters."),
        );
    }

    errors.into_result(DeliveryDetails {
        address: address.to_owned(),
        phone: phone.map(str::to_owned),
        order_note: order_note.to_owned(),
    })
}

/// An order as it was committed.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: Order,
    pub elements: Vec<OrderElement>,
}

/// Checkout service.
pub struct CheckoutService<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Turn the user's cart into a placed order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` without lines,
    /// `CheckoutError::Unavailable` / `CheckoutError::InsufficientStock` when a
    /// product can no longer be sold as requested, and
    /// `CheckoutError::Repository` on database failure. Nothing is written in
    /// any of these cases.
    #[instrument(skip(self, details), fields(user_id = %user_id, order_id = tracing::field::Empty))]
    pub async fn place_order(
        &self,
        user_id: UserId,
        details: &DeliveryDetails,
    ) -> Result<PlacedOrder, CheckoutError> {
        let cart_id = CartRepository::new(self.pool)
            .find(user_id)
            .await?
            .ok_or(CheckoutError::EmptyCart)?;

        let mut tx = self.pool.begin().await?;

        let lines = carts::lock_lines_in(&mut tx, cart_id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        for locked in &lines {
            if !locked.is_active {
                return Err(CheckoutError::Unavailable {
                    product_name: locked.line.product_name.clone(),
                });
            }
            if locked.line.quantity > locked.line.stock {
                return Err(CheckoutError::InsufficientStock {
                    product_name: locked.line.product_name.clone(),
                    available: locked.line.stock.max(0),
                });
            }
        }

        let customer = customers::get_or_create_in(&mut tx, user_id).await?;
        customers::update_contact_in(&mut tx, customer.id, details.phone.as_deref(), &details.address)
            .await?;

        let totals =
            OrderTotals::from_lines(lines.iter().map(|l| (l.current_price, l.line.quantity)));

        let order = orders::insert_order_in(
            &mut tx,
            &NewOrder {
                customer_id: customer.id,
                address: &details.address,
                phone: details.phone.as_deref(),
                order_note: &details.order_note,
                totals,
            },
        )
        .await?;

        let mut elements = Vec::with_capacity(lines.len());
        for locked in &lines {
            let element = orders::insert_element_in(
                &mut tx,
                order.id,
                locked.line.product_id,
                &locked.line.product_name,
                locked.current_price,
                locked.line.quantity,
            )
            .await?;
            elements.push(element);

            products::decrement_stock_in(&mut tx, locked.line.product_id, locked.line.quantity)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => CheckoutError::InsufficientStock {
                        product_name: locked.line.product_name.clone(),
                        available: locked.line.stock.max(0),
                    },
                    other => other.into(),
                })?;
        }

        carts::clear_in(&mut tx, cart_id).await?;
        tx.commit().await?;

        tracing::Span::current().record("order_id", tracing::field::display(order.id));
        tracing::info!(total = %order.total_price, items = elements.len(), "Order placed");

        Ok(PlacedOrder { order, elements })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_delivery_details() {
        let details =
            validate_delivery("  1 Brick Lane, Billund ", Some(" "), Some("Leave at door")).unwrap();
        assert_eq!(details.address, "1 Brick Lane, Billund");
        assert_eq!(details.phone, None);
        assert_eq!(details.order_note, "Leave at door");
    }

    #[test]
    fn test_address_required() {
        let errors = validate_delivery("   ", None, None).unwrap_err();
        assert_eq!(errors.first("address"), Some("Please enter a delivery address."));
    }

    #[test]
    fn test_overlong_fields() {
        let address = "a".repeat(MAX_ADDRESS_LENGTH + 1);
        let note = "n".repeat(MAX_NOTE_LENGTH + 1);
        let errors = validate_delivery(&address, Some(&"1".repeat(40)), Some(&note)).unwrap_err();
        assert!(errors.has("address"));
        assert!(errors.has("phone"));
        assert!(errors.has("order_note"));
    }

    #[test]
    fn test_note_length_boundary() {
        let at_limit = "n".repeat(200);
        let details = validate_delivery("1 Brick Lane", None, Some(&at_limit)).unwrap();
        assert_eq!(details.order_note.chars().count(), 200);

        let over = "n".repeat(201);
        let errors = validate_delivery("1 Brick Lane", None, Some(&over)).unwrap_err();
        assert_eq!(
            errors.first("order_note"),
            Some("Order note must be at most 200 characters.")
        );
    }

    #[test]
    fn test_error_messages() {
        let err = CheckoutError::InsufficientStock {
            product_name: "Red Brick 2x4".into(),
            available: 2,
        };
        assert_eq!(err.to_string(), "Only 2 of Red Brick 2x4 left in stock.");
        assert_eq!(CheckoutError::EmptyCart.to_string(), "Your cart is empty.");
    }
}
