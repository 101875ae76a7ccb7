//! Review submission and helpful votes (JSON).
//!
//! New reviews are stored unapproved and only appear on the product page once
//! a moderator approves them (`bricky-cli reviews approve`).

use axum::{
    Form, Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bricky_core::{ProductId, Rating, ReviewId};

use crate::db::reviews::{NewReview, Vote};
use crate::db::{ProductRepository, RepositoryError, ReviewRepository};
use crate::error::{ApiError, AppError};
use crate::forms::FieldErrors;
use crate::middleware::RequireAuth;
use crate::models::Review;
use crate::state::AppState;

const MAX_TITLE_LENGTH: usize = 100;
const MAX_CONTENT_LENGTH: usize = 2000;
const ALREADY_REVIEWED: &str = "You have already reviewed this product.";

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub product_id: String,
    pub rating: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Review fields that passed validation.
#[derive(Debug, PartialEq, Eq)]
pub struct ValidReview {
    pub rating: Rating,
    pub title: String,
    pub content: String,
}

/// Check rating, title and content.
///
/// # Errors
///
/// Returns the problems found, keyed by form field.
pub fn validate_review(
    rating: Option<&str>,
    title: &str,
    content: &str,
) -> Result<ValidReview, FieldErrors> {
    let mut errors = FieldErrors::new();

    let rating = match rating.map(str::trim).filter(|r| !r.is_empty()) {
        None => {
            errors.add("rating", "Please select a rating.");
            None
        }
        Some(raw) => raw
            .parse::<i16>()
            .ok()
            .and_then(|v| Rating::new(v).ok())
            .or_else(|| {
                errors.add("rating", "Rating must be between 1 and 5.");
                None
            }),
    };

    let title = title.trim();
    if title.is_empty() {
        errors.add("title", "Please enter a title.");
    } else if title.chars().count() > MAX_TITLE_LENGTH {
        errors.add(
            "title",
            format!("Title must be at most {MAX_TITLE_LENGTH} characters."),
        );
    }

    let content = content.trim();
    if content.is_empty() {
        errors.add("content", "Please write your review.");
    } else if content.chars().count() > MAX_CONTENT_LENGTH {
        errors.add(
            "content",
            format!("Review must be at most {MAX_CONTENT_LENGTH} characters."),
        );
    }

    match rating {
        Some(rating) if errors.is_empty() => Ok(ValidReview {
            rating,
            title: title.to_owned(),
            content: content.to_owned(),
        }),
        _ => Err(errors),
    }
}

/// Review as echoed back to the page.
#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub author: String,
    pub rating: Rating,
    pub title: String,
    pub content: String,
    pub created_at: String,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        Self {
            created_at: review.created_display(),
            author: review.author,
            rating: review.rating,
            title: review.title,
            content: review.content,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReviewCreated {
    pub success: bool,
    pub message: &'static str,
    pub review: ReviewView,
}

/// Submit a review for moderation.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ReviewForm>,
) -> Result<Json<ReviewCreated>, ApiError> {
    let product_not_found = || ApiError::not_found("Product not found.");

    let product_id = form
        .product_id
        .trim()
        .parse::<ProductId>()
        .map_err(|_| product_not_found())?;
    let product = ProductRepository::new(state.pool())
        .get_active_by_id(product_id)
        .await?
        .ok_or_else(product_not_found)?;

    let reviews = ReviewRepository::new(state.pool());
    if reviews.exists_for(product.id, user.id).await? {
        return Err(ApiError::bad_request(ALREADY_REVIEWED));
    }

    let valid = validate_review(form.rating.as_deref(), &form.title, &form.content)
        .map_err(|errors| ApiError(AppError::Validation(errors)))?;

    let review = reviews
        .create(&NewReview {
            product_id: product.id,
            author_id: user.id,
            rating: valid.rating,
            title: &valid.title,
            content: &valid.content,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => ApiError::bad_request(ALREADY_REVIEWED),
            other => other.into(),
        })?;

    tracing::info!(review_id = %review.id, product_id = %product.id, "Review submitted");

    Ok(Json(ReviewCreated {
        success: true,
        message: "Review submitted successfully! It will appear after moderation.",
        review: review.into(),
    }))
}

/// Vote form data.
#[derive(Debug, Deserialize)]
pub struct VoteForm {
    pub action: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoteRecorded {
    pub success: bool,
    pub helpful_count: i32,
    pub unhelpful_count: i32,
}

/// Mark an approved review helpful or unhelpful.
///
/// The review is resolved before the action is checked, so an unknown review
/// is a 404 whatever the action says.
#[instrument(skip_all, fields(user_id = %user.id, review_id = %id))]
pub async fn vote(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<VoteForm>,
) -> Result<Json<VoteRecorded>, ApiError> {
    let review_id = parse_review_id(&id)?;
    let reviews = ReviewRepository::new(state.pool());
    if !reviews.is_votable(review_id).await? {
        return Err(review_not_found());
    }

    let vote = form
        .action
        .as_deref()
        .and_then(Vote::from_action)
        .ok_or_else(|| ApiError::bad_request("Invalid action."))?;

    let counts = reviews.vote(review_id, vote).await.map_err(|e| match e {
        RepositoryError::NotFound => review_not_found(),
        other => other.into(),
    })?;

    Ok(Json(VoteRecorded {
        success: true,
        helpful_count: counts.helpful_count,
        unhelpful_count: counts.unhelpful_count,
    }))
}

fn review_not_found() -> ApiError {
    ApiError::not_found("Review not found.")
}

fn parse_review_id(raw: &str) -> Result<ReviewId, ApiError> {
    raw.parse::<i32>()
        .map(ReviewId::new)
        .map_err(|_| review_not_found())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_review() {
        let review = validate_review(Some("4"), "  Great bricks ", "Clutch power is perfect.").unwrap();
        assert_eq!(review.rating.value(), 4);
        assert_eq!(review.title, "Great bricks");
    }

    #[test]
    fn test_rating_out_of_range() {
        for raw in ["0", "6", "five"] {
            let errors = validate_review(Some(raw), "t", "c").unwrap_err();
            assert_eq!(errors.first("rating"), Some("Rating must be between 1 and 5."));
        }
        let errors = validate_review(None, "t", "c").unwrap_err();
        assert_eq!(errors.first("rating"), Some("Please select a rating."));
    }

    #[test]
    fn test_review_id_must_be_numeric() {
        assert_eq!(parse_review_id("42").unwrap(), ReviewId::new(42));
        let err = parse_review_id("abc").unwrap_err();
        assert_eq!(err.0.status(), axum::http::StatusCode::NOT_FOUND);
        assert_eq!(err.0.public_message(), "Review not found.");
    }

    #[test]
    fn test_missing_and_long_fields() {
        let errors = validate_review(Some("5"), " ", "").unwrap_err();
        assert!(errors.has("title"));
        assert!(errors.has("content"));

        let long_title = "t".repeat(MAX_TITLE_LENGTH + 1);
        let errors = validate_review(Some("5"), &long_title, "ok").unwrap_err();
        assert_eq!(errors.first("title"), Some("Title must be at most 100 characters."));
    }
}
