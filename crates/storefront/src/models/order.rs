//! Customers, orders and order elements.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bricky_core::{CustomerId, OrderElementId, OrderId, OrderStatus, ProductId, UserId, line_total};

/// Delivery profile attached one-to-one to a user.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub id: CustomerId,
    pub user_id: UserId,
    pub phone: Option<String>,
    pub address: String,
}

/// A placed order.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub customer_id: CustomerId,
    pub status: OrderStatus,
    pub address: String,
    pub phone: Option<String>,
    pub is_draft: bool,
    pub order_note: String,
    pub registered_at: DateTime<Utc>,
    pub called_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total_price: Decimal,
}

/// A snapshot of one cart line at the time the order was placed.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderElement {
    pub id: OrderElementId,
    pub order_id: OrderId,
    /// `None` once the product has been deleted.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub price: Decimal,
    pub quantity: i32,
}

impl OrderElement {
    #[must_use]
    pub fn total(&self) -> Decimal {
        line_total(self.price, self.quantity)
    }
}
