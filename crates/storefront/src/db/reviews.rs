//! Review repository.

use sqlx::PgPool;

use bricky_core::{ProductId, Rating, ReviewId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{RatingSummary, Review};

const REVIEW_COLUMNS: &str = "r.id, r.product_id, r.author_id, u.username AS author, r.rating, \
                              r.title, r.content, r.is_approved, r.helpful_count, \
                              r.unhelpful_count, r.created_at";

/// Which counter a vote increments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Helpful,
    Unhelpful,
}

impl Vote {
    /// Parse the `action` form value.
    #[must_use]
    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "helpful" => Some(Self::Helpful),
            "unhelpful" => Some(Self::Unhelpful),
            _ => None,
        }
    }
}

/// Counters after a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct VoteCounts {
    pub helpful_count: i32,
    pub unhelpful_count: i32,
}

/// Fields for a new review.
#[derive(Debug)]
pub struct NewReview<'a> {
    pub product_id: ProductId,
    pub author_id: UserId,
    pub rating: Rating,
    pub title: &'a str,
    pub content: &'a str,
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a review awaiting moderation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the author already reviewed the product.
    pub async fn create(&self, review: &NewReview<'_>) -> Result<Review, RepositoryError> {
        let created = sqlx::query_as::<_, Review>(&format!(
            "WITH r AS (
                 INSERT INTO storefront.reviews (product_id, author_id, rating, title, content)
                 VALUES ($1, $2, $3, $4, $5)
                 RETURNING *
             )
             SELECT {REVIEW_COLUMNS}
             FROM r JOIN storefront.users u ON u.id = r.author_id"
        ))
        .bind(review.product_id)
        .bind(review.author_id)
        .bind(review.rating)
        .bind(review.title)
        .bind(review.content)
        .fetch_one(self.pool)
        .await
        .map_err(conflict_on_unique("review already exists"))?;

        Ok(created)
    }

    /// Whether the author already reviewed the product (approved or not).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists_for(
        &self,
        product_id: ProductId,
        author_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM storefront.reviews WHERE product_id = $1 AND author_id = $2
            )
            ",
        )
        .bind(product_id)
        .bind(author_id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Approved reviews for a product, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn approved_for_product(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS}
             FROM storefront.reviews r JOIN storefront.users u ON u.id = r.author_id
             WHERE r.product_id = $1 AND r.is_approved
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(product_id)
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// Count and average rating of approved reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn rating_summary(&self, product_id: ProductId) -> Result<RatingSummary, RepositoryError> {
        let summary = sqlx::query_as::<_, RatingSummary>(
            r"
            SELECT COUNT(*) AS count, AVG(rating)::NUMERIC AS average
            FROM storefront.reviews
            WHERE product_id = $1 AND is_approved
            ",
        )
        .bind(product_id)
        .fetch_one(self.pool)
        .await?;

        Ok(summary)
    }

    /// Whether an approved review with this ID exists (only those take votes).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn is_votable(&self, id: ReviewId) -> Result<bool, RepositoryError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.reviews WHERE id = $1 AND is_approved)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Increment one of the vote counters of an approved review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no approved review has this ID.
    pub async fn vote(&self, id: ReviewId, vote: Vote) -> Result<VoteCounts, RepositoryError> {
        let sql = match vote {
            Vote::Helpful => {
                r"
                UPDATE storefront.reviews SET helpful_count = helpful_count + 1
                WHERE id = $1 AND is_approved
                RETURNING helpful_count, unhelpful_count
                "
            }
            Vote::Unhelpful => {
                r"
                UPDATE storefront.reviews SET unhelpful_count = unhelpful_count + 1
                WHERE id = $1 AND is_approved
                RETURNING helpful_count, unhelpful_count
                "
            }
        };

        sqlx::query_as::<_, VoteCounts>(sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    /// Reviews waiting for moderation, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending(&self) -> Result<Vec<Review>, RepositoryError> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {REVIEW_COLUMNS}
             FROM storefront.reviews r JOIN storefront.users u ON u.id = r.author_id
             WHERE NOT r.is_approved
             ORDER BY r.created_at, r.id"
        ))
        .fetch_all(self.pool)
        .await?;

        Ok(reviews)
    }

    /// Approve or hide a review.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the review does not exist.
    pub async fn set_approved(&self, id: ReviewId, approved: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE storefront.reviews SET is_approved = $2 WHERE id = $1")
            .bind(id)
            .bind(approved)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_from_action() {
        assert_eq!(Vote::from_action("helpful"), Some(Vote::Helpful));
        assert_eq!(Vote::from_action("unhelpful"), Some(Vote::Unhelpful));
        assert_eq!(Vote::from_action("HELPFUL"), None);
        assert_eq!(Vote::from_action(""), None);
    }
}
