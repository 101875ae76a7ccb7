//! Cart operations behind the JSON cart endpoints.
//!
//! Every mutation re-reads the cart afterwards so callers can report the
//! new count and grand total without a second round trip of their own.

use rust_decimal::Decimal;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use bricky_core::{CartItemId, ProductId, UserId};

use crate::db::{CartRepository, ProductRepository, RepositoryError};
use crate::models::CartSummary;

/// Largest quantity a single request may ask for.
pub const MAX_QUANTITY: i32 = 999;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("Product not found.")]
    ProductNotFound,

    #[error("Item not found in your cart.")]
    ItemNotFound,

    #[error("Quantity must be at least 1.")]
    InvalidQuantity,

    #[error("Only {available} items available in stock.")]
    InsufficientStock { available: i32 },

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Result of adding a product.
#[derive(Debug)]
pub struct Added {
    pub product_name: String,
    pub summary: CartSummary,
}

/// Result of changing a line's quantity.
#[derive(Debug)]
pub struct Updated {
    /// New line total, or zero when the line was removed.
    pub item_total: Decimal,
    pub summary: CartSummary,
}

/// Cart service for one request.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// The user's cart, empty when none exists yet.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn summary(&self, user_id: UserId) -> Result<CartSummary, CartError> {
        let lines = match self.carts.find(user_id).await? {
            Some(cart_id) => self.carts.lines(cart_id).await?,
            None => Vec::new(),
        };
        Ok(CartSummary::from_lines(lines))
    }

    /// Add `quantity` units of an active product.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` for unknown or inactive products,
    /// `CartError::InvalidQuantity` below 1 and `CartError::InsufficientStock`
    /// when the cart would hold more than the product's stock.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id))]
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> Result<Added, CartError> {
        if !(1..=MAX_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidQuantity);
        }

        let product = self
            .products
            .get_active_by_id(product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let cart_id = self.carts.get_or_create(user_id).await?;
        let existing = self.carts.quantity_of(cart_id, product_id).await?;
        check_stock(existing + quantity, product.stock)?;

        self.carts
            .upsert_item(cart_id, product_id, quantity, product.price)
            .await?;

        tracing::info!(quantity, "Added to cart");
        Ok(Added {
            product_name: product.name,
            summary: CartSummary::from_lines(self.carts.lines(cart_id).await?),
        })
    }

    /// Set a line's quantity. Zero removes the line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` when the line is not in the user's
    /// cart and `CartError::InsufficientStock` when `quantity` exceeds stock.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn update(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> Result<Updated, CartError> {
        if !(0..=MAX_QUANTITY).contains(&quantity) {
            return Err(CartError::InvalidQuantity);
        }

        let cart_id = self.carts.find(user_id).await?.ok_or(CartError::ItemNotFound)?;
        let line = self
            .carts
            .find_item(cart_id, item_id)
            .await?
            .ok_or(CartError::ItemNotFound)?;

        if quantity == 0 {
            self.carts
                .remove_item(cart_id, item_id)
                .await
                .map_err(not_found_as_item)?;
            return Ok(Updated {
                item_total: Decimal::ZERO,
                summary: CartSummary::from_lines(self.carts.lines(cart_id).await?),
            });
        }

        check_stock(quantity, line.stock)?;

        // Refresh the unit price from the live product when it's still listed.
        let price = self
            .products
            .get_active_by_id(line.product_id)
            .await?
            .map_or(line.price, |p| p.price);

        self.carts
            .set_quantity(cart_id, item_id, quantity, price)
            .await
            .map_err(not_found_as_item)?;

        let summary = CartSummary::from_lines(self.carts.lines(cart_id).await?);
        let item_total = summary
            .lines
            .iter()
            .find(|l| l.item_id == item_id)
            .map_or(Decimal::ZERO, crate::models::CartLine::total);

        Ok(Updated {
            item_total,
            summary,
        })
    }

    /// Remove one line from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` when the line is not in the user's cart.
    #[instrument(skip(self), fields(user_id = %user_id, item_id = %item_id))]
    pub async fn remove(&self, user_id: UserId, item_id: CartItemId) -> Result<CartSummary, CartError> {
        let cart_id = self.carts.find(user_id).await?.ok_or(CartError::ItemNotFound)?;
        self.carts
            .remove_item(cart_id, item_id)
            .await
            .map_err(not_found_as_item)?;
        Ok(CartSummary::from_lines(self.carts.lines(cart_id).await?))
    }

    /// Empty the user's cart. A missing cart is already empty.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear(&self, user_id: UserId) -> Result<(), CartError> {
        if let Some(cart_id) = self.carts.find(user_id).await? {
            self.carts.clear(cart_id).await?;
        }
        Ok(())
    }

    /// Total units in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the query fails.
    pub async fn count(&self, user_id: UserId) -> Result<i64, CartError> {
        Ok(self.carts.count(user_id).await?)
    }
}

/// Reject a line quantity above what the product has in stock.
fn check_stock(wanted: i32, stock: i32) -> Result<(), CartError> {
    if wanted > stock {
        return Err(CartError::InsufficientStock {
            available: stock.max(0),
        });
    }
    Ok(())
}

fn not_found_as_item(e: RepositoryError) -> CartError {
    match e {
        RepositoryError::NotFound => CartError::ItemNotFound,
        other => CartError::Repository(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_stock() {
        assert!(check_stock(3, 3).is_ok());
        assert!(check_stock(1, 10).is_ok());

        let err = check_stock(4, 3).unwrap_err();
        assert_eq!(err.to_string(), "Only 3 items available in stock.");
    }

    #[test]
    fn test_negative_stock_reported_as_zero() {
        let err = check_stock(1, -2).unwrap_err();
        assert!(matches!(err, CartError::InsufficientStock { available: 0 }));
    }

    #[test]
    fn test_not_found_maps_to_item() {
        assert!(matches!(
            not_found_as_item(RepositoryError::NotFound),
            CartError::ItemNotFound
        ));
        assert!(matches!(
            not_found_as_item(RepositoryError::Conflict("x".into())),
            CartError::Repository(_)
        ));
    }
}
