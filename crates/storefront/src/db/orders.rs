//! Order repository.
//!
//! Order placement itself is a multi-table transaction driven by
//! `services::checkout`; this module provides its building blocks plus the
//! read side used by the confirmation and history pages.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use bricky_core::{CustomerId, OrderId, OrderTotals, ProductId, UserId};

use super::RepositoryError;
use crate::models::{Order, OrderElement};

const ORDER_COLUMNS: &str = "o.id, o.customer_id, o.status, o.address, o.phone, o.is_draft, \
                             o.order_note, o.registered_at, o.called_at, o.delivered_at, \
                             o.subtotal, o.shipping, o.tax, o.total_price";

/// Fields for a new order row.
#[derive(Debug)]
pub struct NewOrder<'a> {
    pub customer_id: CustomerId,
    pub address: &'a str,
    pub phone: Option<&'a str>,
    pub order_note: &'a str,
    pub totals: OrderTotals,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// An order, only if it belongs to `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS}
             FROM storefront.orders o
             JOIN storefront.customers cu ON cu.id = o.customer_id
             WHERE o.id = $1 AND cu.user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(order)
    }

    /// The user's placed orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS}
             FROM storefront.orders o
             JOIN storefront.customers cu ON cu.id = o.customer_id
             WHERE cu.user_id = $1 AND NOT o.is_draft
             ORDER BY o.registered_at DESC, o.id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        Ok(orders)
    }

    /// Element snapshots of an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn elements(&self, order_id: OrderId) -> Result<Vec<OrderElement>, RepositoryError> {
        let elements = sqlx::query_as::<_, OrderElement>(
            r"
            SELECT id, order_id, product_id, product_name, price, quantity
            FROM storefront.order_elements
            WHERE order_id = $1
            ORDER BY id
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(elements)
    }

    /// Recompute stored totals from the order's elements.
    ///
    /// Used after staff edit an order's elements by hand.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist.
    pub async fn recalculate_total(&self, order_id: OrderId) -> Result<Order, RepositoryError> {
        let elements = self.elements(order_id).await?;
        let totals = OrderTotals::from_lines(elements.iter().map(|e| (e.price, e.quantity)));

        sqlx::query_as::<_, Order>(&format!(
            "UPDATE storefront.orders o
             SET subtotal = $2, shipping = $3, tax = $4, total_price = $5
             WHERE o.id = $1
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(order_id)
        .bind(totals.subtotal)
        .bind(totals.shipping)
        .bind(totals.tax)
        .bind(totals.total)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }
}

/// Insert a placed (non-draft) order.
pub(crate) async fn insert_order_in(
    conn: &mut PgConnection,
    order: &NewOrder<'_>,
) -> Result<Order, RepositoryError> {
    let row = sqlx::query_as::<_, Order>(&format!(
        "INSERT INTO storefront.orders AS o
             (customer_id, status, address, phone, is_draft, order_note,
              subtotal, shipping, tax, total_price)
         VALUES ($1, 'new', $2, $3, FALSE, $4, $5, $6, $7, $8)
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.customer_id)
    .bind(order.address)
    .bind(order.phone)
    .bind(order.order_note)
    .bind(order.totals.subtotal)
    .bind(order.totals.shipping)
    .bind(order.totals.tax)
    .bind(order.totals.total)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

/// Insert one element snapshot.
pub(crate) async fn insert_element_in(
    conn: &mut PgConnection,
    order_id: OrderId,
    product_id: ProductId,
    product_name: &str,
    price: Decimal,
    quantity: i32,
) -> Result<OrderElement, RepositoryError> {
    let element = sqlx::query_as::<_, OrderElement>(
        r"
        INSERT INTO storefront.order_elements (order_id, product_id, product_name, price, quantity)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, order_id, product_id, product_name, price, quantity
        ",
    )
    .bind(order_id)
    .bind(product_id)
    .bind(product_name)
    .bind(price)
    .bind(quantity)
    .fetch_one(conn)
    .await?;

    Ok(element)
}
