//! Product repository: listing search, detail lookups and autocomplete.
//!
//! Listing queries are assembled with [`sqlx::QueryBuilder`] so every user
//! supplied value is bound, never interpolated.

use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use bricky_core::{CategoryId, ProductId, Slug};

use super::categories::escape_like;
use super::{RepositoryError, conflict_on_unique};
use crate::models::{Page, PriceRange, Product, ProductCard, clamp_page};

/// Products per listing page.
pub const PAGE_SIZE: i64 = 12;

const CARD_COLUMNS: &str = "p.id, p.name, p.slug, p.description, p.picture, p.price, p.stock, \
                            p.category_id, p.is_active, p.created_at, p.updated_at, \
                            c.title AS category_title, c.slug AS category_slug";

const PRODUCT_COLUMNS: &str = "id, name, slug, description, picture, price, stock, category_id, \
                               is_active, created_at, updated_at";

/// Listing filters. `None` means "don't filter on this".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilters {
    /// Category slug.
    pub category: Option<String>,
    /// Case-insensitive substring over name or description.
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

/// Whitelisted listing orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    pub const ALL: [Self; 6] = [
        Self::Newest,
        Self::Oldest,
        Self::PriceAsc,
        Self::PriceDesc,
        Self::NameAsc,
        Self::NameDesc,
    ];

    /// Parse a `sort` query value; anything unknown falls back to newest first.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        value
            .and_then(|v| Self::ALL.into_iter().find(|s| s.param() == v))
            .unwrap_or_default()
    }

    /// Query string form.
    #[must_use]
    pub const fn param(self) -> &'static str {
        match self {
            Self::Newest => "-created_at",
            Self::Oldest => "created_at",
            Self::PriceAsc => "price",
            Self::PriceDesc => "-price",
            Self::NameAsc => "name",
            Self::NameDesc => "-name",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest",
            Self::Oldest => "Oldest",
            Self::PriceAsc => "Price: low to high",
            Self::PriceDesc => "Price: high to low",
            Self::NameAsc => "Name: A to Z",
            Self::NameDesc => "Name: Z to A",
        }
    }

    /// `ORDER BY` clause. `p.id` breaks ties so pages are stable.
    const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => " ORDER BY p.created_at DESC, p.id",
            Self::Oldest => " ORDER BY p.created_at ASC, p.id",
            Self::PriceAsc => " ORDER BY p.price ASC, p.id",
            Self::PriceDesc => " ORDER BY p.price DESC, p.id",
            Self::NameAsc => " ORDER BY p.name ASC, p.id",
            Self::NameDesc => " ORDER BY p.name DESC, p.id",
        }
    }
}

/// Catalog data for a new or updated product.
#[derive(Debug)]
pub struct ProductInput<'a> {
    pub name: &'a str,
    pub slug: &'a Slug,
    pub description: &'a str,
    pub picture: Option<&'a str>,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
    pub is_active: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of active products matching `filters`.
    ///
    /// Out-of-range pages are clamped to the nearest valid page.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn search(
        &self,
        filters: &ProductFilters,
        sort: ProductSort,
        page: i64,
    ) -> Result<Page<ProductCard>, RepositoryError> {
        let mut count_query = QueryBuilder::<Postgres>::new(
            "SELECT COUNT(*) FROM storefront.products p \
             JOIN storefront.categories c ON c.id = p.category_id",
        );
        push_filters(&mut count_query, filters);
        let total_items = count_query
            .build_query_scalar::<i64>()
            .fetch_one(self.pool)
            .await?;

        let (number, total_pages) = clamp_page(page, total_items, PAGE_SIZE);

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CARD_COLUMNS} FROM storefront.products p \
             JOIN storefront.categories c ON c.id = p.category_id"
        ));
        push_filters(&mut query, filters);
        query.push(sort.order_by());
        query.push(" LIMIT ").push_bind(PAGE_SIZE);
        query
            .push(" OFFSET ")
            .push_bind((number - 1) * PAGE_SIZE);

        let items = query
            .build_query_as::<ProductCard>()
            .fetch_all(self.pool)
            .await?;

        Ok(Page {
            items,
            number,
            total_pages,
            total_items,
        })
    }

    /// Lowest and highest price among active products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn price_range(&self) -> Result<PriceRange, RepositoryError> {
        let range = sqlx::query_as::<_, PriceRange>(
            r"
            SELECT MIN(price) AS min_price, MAX(price) AS max_price
            FROM storefront.products
            WHERE is_active
            ",
        )
        .fetch_one(self.pool)
        .await?;

        Ok(range)
    }

    /// An active product by slug, with its category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_slug(&self, slug: &str) -> Result<Option<ProductCard>, RepositoryError> {
        let product = sqlx::query_as::<_, ProductCard>(&format!(
            "SELECT {CARD_COLUMNS} FROM storefront.products p \
             JOIN storefront.categories c ON c.id = p.category_id \
             WHERE p.slug = $1 AND p.is_active"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// An active product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_active_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Names of active products containing `q`, for autocomplete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn autocomplete(&self, q: &str, limit: i64) -> Result<Vec<String>, RepositoryError> {
        let names = sqlx::query_scalar::<_, String>(
            r"
            SELECT name
            FROM storefront.products
            WHERE is_active AND name ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY name
            LIMIT $2
            ",
        )
        .bind(escape_like(q))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(names)
    }

    /// Insert a product, or update it in place when the slug already exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name belongs to another product.
    pub async fn upsert(&self, input: &ProductInput<'_>) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO storefront.products
                 (id, name, slug, description, picture, price, stock, category_id, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (slug) DO UPDATE SET
                 name = EXCLUDED.name,
                 description = EXCLUDED.description,
                 picture = EXCLUDED.picture,
                 price = EXCLUDED.price,
                 stock = EXCLUDED.stock,
                 category_id = EXCLUDED.category_id,
                 is_active = EXCLUDED.is_active,
                 updated_at = NOW()
             RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(ProductId::generate())
        .bind(input.name)
        .bind(input.slug)
        .bind(input.description)
        .bind(input.picture)
        .bind(input.price)
        .bind(input.stock)
        .bind(input.category_id)
        .bind(input.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("product name already exists"))?;

        Ok(product)
    }
}

/// Take `quantity` units out of stock. The row must already be locked.
///
/// Fails with `NotFound` rather than going negative.
pub(crate) async fn decrement_stock_in(
    conn: &mut sqlx::PgConnection,
    product_id: ProductId,
    quantity: i32,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE storefront.products
        SET stock = stock - $2, updated_at = NOW()
        WHERE id = $1 AND stock >= $2
        ",
    )
    .bind(product_id)
    .bind(quantity)
    .execute(conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Append the `WHERE` clause shared by the count and page queries.
fn push_filters(query: &mut QueryBuilder<'_, Postgres>, filters: &ProductFilters) {
    query.push(" WHERE p.is_active");

    if let Some(category) = &filters.category {
        query.push(" AND c.slug = ").push_bind(category.clone());
    }

    if let Some(search) = &filters.search {
        let pattern = format!("%{}%", escape_like(search));
        query
            .push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(r" ESCAPE '\' OR p.description ILIKE ")
            .push_bind(pattern)
            .push(r" ESCAPE '\')");
    }

    if let Some(min) = filters.min_price {
        query.push(" AND p.price >= ").push_bind(min);
    }

    if let Some(max) = filters.max_price {
        query.push(" AND p.price <= ").push_bind(max);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_whitelist() {
        assert_eq!(ProductSort::from_param(Some("-price")), ProductSort::PriceDesc);
        assert_eq!(ProductSort::from_param(Some("name")), ProductSort::NameAsc);
        assert_eq!(ProductSort::from_param(Some("stock; DROP TABLE")), ProductSort::Newest);
        assert_eq!(ProductSort::from_param(None), ProductSort::Newest);
        for sort in ProductSort::ALL {
            assert_eq!(ProductSort::from_param(Some(sort.param())), sort);
        }
    }

    #[test]
    fn test_filters_are_bound() {
        let filters = ProductFilters {
            category: Some("technic".to_string()),
            search: Some("gear's".to_string()),
            min_price: Some(Decimal::new(5, 0)),
            max_price: Some(Decimal::new(50, 0)),
        };
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM storefront.products p");
        push_filters(&mut query, &filters);
        let sql = query.sql();
        assert!(sql.contains("c.slug = $1"));
        assert!(sql.contains("p.name ILIKE $2"));
        assert!(sql.contains("p.description ILIKE $3"));
        assert!(sql.contains("p.price >= $4"));
        assert!(sql.contains("p.price <= $5"));
        assert!(!sql.contains("gear"));
    }

    #[test]
    fn test_no_filters_only_active() {
        let mut query = QueryBuilder::<Postgres>::new("SELECT 1 FROM storefront.products p");
        push_filters(&mut query, &ProductFilters::default());
        assert!(query.sql().ends_with(" WHERE p.is_active"));
    }
}
