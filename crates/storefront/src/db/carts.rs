//! Cart repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bricky_core::{CartId, CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::CartLine;

const LINE_COLUMNS: &str = "ci.id AS item_id, ci.product_id, p.name AS product_name, \
                            p.slug AS product_slug, p.picture, ci.price, ci.quantity, p.stock";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's cart, creating an empty one on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<CartId, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            r"
            INSERT INTO storefront.carts (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET updated_at = NOW()
            RETURNING id
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(id)
    }

    /// The user's cart if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, user_id: UserId) -> Result<Option<CartId>, RepositoryError> {
        let id = sqlx::query_scalar::<_, CartId>(
            "SELECT id FROM storefront.carts WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(id)
    }

    /// Cart lines joined with their products, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(&format!(
            "SELECT {LINE_COLUMNS}
             FROM storefront.cart_items ci
             JOIN storefront.products p ON p.id = ci.product_id
             WHERE ci.cart_id = $1
             ORDER BY ci.added_at, ci.id"
        ))
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;

        Ok(lines)
    }

    /// A single line, only if it belongs to `cart_id`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_item(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
    ) -> Result<Option<CartLine>, RepositoryError> {
        let line = sqlx::query_as::<_, CartLine>(&format!(
            "SELECT {LINE_COLUMNS}
             FROM storefront.cart_items ci
             JOIN storefront.products p ON p.id = ci.product_id
             WHERE ci.cart_id = $1 AND ci.id = $2"
        ))
        .bind(cart_id)
        .bind(item_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(line)
    }

    /// Quantity of `product_id` already in the cart (0 when absent).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn quantity_of(
        &self,
        cart_id: CartId,
        product_id: ProductId,
    ) -> Result<i32, RepositoryError> {
        let quantity = sqlx::query_scalar::<_, i32>(
            "SELECT quantity FROM storefront.cart_items WHERE cart_id = $1 AND product_id = $2",
        )
        .bind(cart_id)
        .bind(product_id)
        .fetch_optional(self.pool)
        .await?;

        Ok(quantity.unwrap_or(0))
    }

    /// Add `quantity` units of a product, merging with an existing line.
    ///
    /// The line's unit price is refreshed to `price`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        price: Decimal,
    ) -> Result<CartItemId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, CartItemId>(
            r"
            INSERT INTO storefront.cart_items (cart_id, product_id, quantity, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (cart_id, product_id) DO UPDATE
                SET quantity = storefront.cart_items.quantity + EXCLUDED.quantity,
                    price = EXCLUDED.price
            RETURNING id
            ",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(price)
        .fetch_one(&mut *tx)
        .await?;

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;

        Ok(id)
    }

    /// Replace a line's quantity and refresh its unit price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn set_quantity(
        &self,
        cart_id: CartId,
        item_id: CartItemId,
        quantity: i32,
        price: Decimal,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE storefront.cart_items
            SET quantity = $3, price = $4
            WHERE cart_id = $1 AND id = $2
            ",
        )
        .bind(cart_id)
        .bind(item_id)
        .bind(quantity)
        .bind(price)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        touch(&mut tx, cart_id).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Remove one line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line is not in this cart.
    pub async fn remove_item(&self, cart_id: CartId, item_id: CartItemId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.cart_items WHERE cart_id = $1 AND id = $2",
        )
        .bind(cart_id)
        .bind(item_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Remove every line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_items WHERE cart_id = $1")
            .bind(cart_id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Total units in the user's cart (0 without a cart).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COALESCE(SUM(ci.quantity), 0)::BIGINT
            FROM storefront.carts c
            JOIN storefront.cart_items ci ON ci.cart_id = c.id
            WHERE c.user_id = $1
            ",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count)
    }
}

async fn touch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    cart_id: CartId,
) -> Result<(), RepositoryError> {
    sqlx::query("UPDATE storefront.carts SET updated_at = NOW() WHERE id = $1")
        .bind(cart_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// A cart line with its product row locked for the rest of the transaction.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct LockedLine {
    #[sqlx(flatten)]
    pub line: CartLine,
    pub is_active: bool,
    /// The product's price right now, which is what the order records.
    pub current_price: Decimal,
}

/// Lock the products behind every line of the cart (`FOR UPDATE`).
pub(crate) async fn lock_lines_in(
    conn: &mut sqlx::PgConnection,
    cart_id: CartId,
) -> Result<Vec<LockedLine>, RepositoryError> {
    let lines = sqlx::query_as::<_, LockedLine>(&format!(
        "SELECT {LINE_COLUMNS}, p.is_active, p.price AS current_price
         FROM storefront.cart_items ci
         JOIN storefront.products p ON p.id = ci.product_id
         WHERE ci.cart_id = $1
         ORDER BY p.id
         FOR UPDATE OF p"
    ))
    .bind(cart_id)
    .fetch_all(conn)
    .await?;

    Ok(lines)
}

/// [`CartRepository::clear`] inside a transaction.
pub(crate) async fn clear_in(
    conn: &mut sqlx::PgConnection,
    cart_id: CartId,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM storefront.cart_items WHERE cart_id = $1")
        .bind(cart_id)
        .execute(conn)
        .await?;
    Ok(())
}
