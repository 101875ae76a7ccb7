//! Category repository.

use sqlx::PgPool;

use bricky_core::{CategoryId, Slug};

use super::{RepositoryError, conflict_on_unique};
use crate::models::Category;

/// Repository for category database operations.
pub struct CategoryRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CategoryRepository<'a> {
    /// Create a new category repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All categories ordered by title.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let categories = sqlx::query_as::<_, Category>(
            r"
            SELECT id, title, slug, picture, created_at
            FROM storefront.categories
            ORDER BY title
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(categories)
    }

    /// Get a category by slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            SELECT id, title, slug, picture, created_at
            FROM storefront.categories
            WHERE slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(category)
    }

    /// Insert a category, or update its picture if the slug already exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the title is used by a different slug.
    pub async fn upsert(
        &self,
        title: &str,
        slug: &Slug,
        picture: Option<&str>,
    ) -> Result<Category, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            INSERT INTO storefront.categories (id, title, slug, picture)
            VALUES ($1, $2, $3, COALESCE($4, 'user_pictures/default.png'))
            ON CONFLICT (slug) DO UPDATE
                SET title = EXCLUDED.title, picture = EXCLUDED.picture
            RETURNING id, title, slug, picture, created_at
            ",
        )
        .bind(CategoryId::generate())
        .bind(title)
        .bind(slug)
        .bind(picture)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("category title already exists"))?;

        Ok(category)
    }

    /// Category titles containing `q` (case-insensitive), for autocomplete.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn autocomplete(&self, q: &str, limit: i64) -> Result<Vec<String>, RepositoryError> {
        let titles = sqlx::query_scalar::<_, String>(
            r"
            SELECT title
            FROM storefront.categories
            WHERE title ILIKE '%' || $1 || '%' ESCAPE '\'
            ORDER BY title
            LIMIT $2
            ",
        )
        .bind(escape_like(q))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(titles)
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
pub(crate) fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("brick"), "brick");
    }
}
