//! In-process cache for catalog data every listing page needs.
//!
//! Categories and the price range change rarely, so they are cached using
//! `moka` (60-second TTL) instead of being re-queried on each request.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use sqlx::PgPool;
use tracing::debug;

use crate::db::{CategoryRepository, ProductRepository, RepositoryError};
use crate::models::{Category, PriceRange};

const TTL: Duration = Duration::from_secs(60);

/// Cache key for catalog lookups.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
enum CacheKey {
    Categories,
    PriceRange,
}

/// Cached value types.
#[derive(Debug, Clone)]
enum CacheValue {
    Categories(Arc<Vec<Category>>),
    PriceRange(PriceRange),
}

/// Shared catalog cache. Cheap to clone.
#[derive(Clone)]
pub struct CatalogCache {
    cache: Cache<CacheKey, CacheValue>,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().max_capacity(16).time_to_live(TTL).build(),
        }
    }

    /// All categories, alphabetically.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails on a miss.
    pub async fn categories(&self, pool: &PgPool) -> Result<Arc<Vec<Category>>, RepositoryError> {
        if let Some(CacheValue::Categories(categories)) = self.cache.get(&CacheKey::Categories).await
        {
            debug!("Cache hit for categories");
            return Ok(categories);
        }

        let categories = Arc::new(CategoryRepository::new(pool).list().await?);
        self.cache
            .insert(CacheKey::Categories, CacheValue::Categories(Arc::clone(&categories)))
            .await;
        Ok(categories)
    }

    /// Lowest and highest active product price.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails on a miss.
    pub async fn price_range(&self, pool: &PgPool) -> Result<PriceRange, RepositoryError> {
        if let Some(CacheValue::PriceRange(range)) = self.cache.get(&CacheKey::PriceRange).await {
            debug!("Cache hit for price range");
            return Ok(range);
        }

        let range = ProductRepository::new(pool).price_range().await?;
        self.cache
            .insert(CacheKey::PriceRange, CacheValue::PriceRange(range))
            .await;
        Ok(range)
    }
}
