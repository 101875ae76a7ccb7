//! Catalog types: categories and products.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use bricky_core::{CategoryId, ProductId};

/// A product category.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    pub slug: String,
    pub picture: String,
    pub created_at: DateTime<Utc>,
}

/// A product as stored.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub picture: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether at least one unit can be sold.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Price formatted for display, e.g. `$19.99`.
    #[must_use]
    pub fn price_display(&self) -> String {
        format!("${:.2}", self.price)
    }

    /// Picture URL, falling back to the placeholder image.
    #[must_use]
    pub fn picture_url(&self) -> String {
        self.picture.as_deref().map_or_else(
            || "/static/img/placeholder.svg".to_string(),
            |p| format!("/media/{p}"),
        )
    }
}

/// A product joined with its category, as shown in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductCard {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub product: Product,
    pub category_title: String,
    pub category_slug: String,
}

/// Lowest and highest price among active products.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct PriceRange {
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// One page of results plus what the pager needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually served.
    pub number: i64,
    pub total_pages: i64,
    pub total_items: i64,
}

impl<T> Page<T> {
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.number < self.total_pages
    }

    #[must_use]
    pub const fn previous_number(&self) -> i64 {
        self.number - 1
    }

    #[must_use]
    pub const fn next_number(&self) -> i64 {
        self.number + 1
    }
}

/// Resolve a requested page against the result size.
///
/// Returns `(page, total_pages)`. There is always at least one page; a page
/// below 1 serves the first page and one past the end serves the last.
#[must_use]
pub fn clamp_page(requested: i64, total_items: i64, per_page: i64) -> (i64, i64) {
    let per_page = per_page.max(1);
    let total_pages = ((total_items.max(0) + per_page - 1) / per_page).max(1);
    (requested.clamp(1, total_pages), total_pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(picture: Option<&str>, stock: i32) -> Product {
        Product {
            id: ProductId::generate(),
            name: "Red Brick 2x4".to_string(),
            slug: "red-brick-2x4".to_string(),
            description: String::new(),
            picture: picture.map(str::to_string),
            price: Decimal::new(199, 2),
            stock,
            category_id: CategoryId::generate(),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_price_display() {
        assert_eq!(product(None, 1).price_display(), "$1.99");
    }

    #[test]
    fn test_picture_url_fallback() {
        assert_eq!(product(None, 1).picture_url(), "/static/img/placeholder.svg");
        assert_eq!(
            product(Some("products/red.png"), 1).picture_url(),
            "/media/products/red.png"
        );
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(1, 0, 12), (1, 1));
        assert_eq!(clamp_page(2, 12, 12), (1, 1));
        assert_eq!(clamp_page(2, 13, 12), (2, 2));
        assert_eq!(clamp_page(99, 30, 12), (3, 3));
        assert_eq!(clamp_page(-4, 30, 12), (1, 3));
    }

    #[test]
    fn test_in_stock() {
        assert!(product(None, 3).in_stock());
        assert!(!product(None, 0).in_stock());
    }
}
