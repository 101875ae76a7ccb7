//! Product reviews.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use bricky_core::{ProductId, Rating, ReviewId, UserId};

/// A review joined with its author's username.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Review {
    pub id: ReviewId,
    pub product_id: ProductId,
    pub author_id: UserId,
    pub author: String,
    pub rating: Rating,
    pub title: String,
    pub content: String,
    pub is_approved: bool,
    pub helpful_count: i32,
    pub unhelpful_count: i32,
    pub created_at: DateTime<Utc>,
}

impl Review {
    /// Date shown under the review, e.g. `March 04, 2026`.
    #[must_use]
    pub fn created_display(&self) -> String {
        self.created_at.format("%B %d, %Y").to_string()
    }
}

/// Aggregate of approved reviews for one product.
#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct RatingSummary {
    pub count: i64,
    pub average: Option<Decimal>,
}

impl RatingSummary {
    /// Average rounded to one decimal, or `None` without reviews.
    #[must_use]
    pub fn average_display(&self) -> Option<String> {
        self.average.map(|avg| format!("{:.1}", avg.round_dp(1)))
    }

    /// Whole stars to fill when drawing the average.
    #[must_use]
    pub fn filled_stars(&self) -> u8 {
        self.average
            .and_then(|avg| avg.round().to_u8())
            .unwrap_or(0)
            .min(5)
    }
}
