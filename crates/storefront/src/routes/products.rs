//! Product detail and autocomplete handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::PageContext;
use crate::db::{CategoryRepository, ProductRepository, ReviewRepository};
use crate::error::{ApiError, AppError, Result};
use crate::filters;
use crate::models::{ProductCard, RatingSummary, Review};
use crate::state::AppState;

/// Queries shorter than this get no suggestions.
const MIN_AUTOCOMPLETE_CHARS: usize = 2;
const MAX_PRODUCT_SUGGESTIONS: i64 = 5;
const MAX_CATEGORY_SUGGESTIONS: i64 = 3;

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/product.html")]
pub struct ProductTemplate {
    pub page: PageContext,
    pub product: ProductCard,
    pub reviews: Vec<Review>,
    pub summary: RatingSummary,
    /// The logged-in user already left a review (approved or pending).
    pub has_reviewed: bool,
}

/// Display one active product.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let product = ProductRepository::new(state.pool())
        .get_active_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product {slug}")))?;

    let reviews_repo = ReviewRepository::new(state.pool());
    let product_id = product.product.id;
    let reviews = reviews_repo.approved_for_product(product_id).await?;
    let summary = reviews_repo.rating_summary(product_id).await?;
    let has_reviewed = match &page.current_user {
        Some(user) => reviews_repo.exists_for(product_id, user.id).await?,
        None => false,
    };

    Ok(ProductTemplate {
        page,
        product,
        reviews,
        summary,
        has_reviewed,
    })
}

/// Autocomplete query parameters.
#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    pub q: Option<String>,
}

#[derive(Debug, Default, Serialize)]
pub struct Suggestions {
    pub products: Vec<String>,
    pub categories: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub suggestions: Suggestions,
}

/// Product names and category titles containing `q`.
#[instrument(skip(state))]
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> std::result::Result<Json<AutocompleteResponse>, ApiError> {
    let q = query.q.as_deref().map(str::trim).unwrap_or_default();
    if q.chars().count() < MIN_AUTOCOMPLETE_CHARS {
        return Ok(Json(AutocompleteResponse {
            suggestions: Suggestions::default(),
        }));
    }

    let products = ProductRepository::new(state.pool())
        .autocomplete(q, MAX_PRODUCT_SUGGESTIONS)
        .await?;
    let categories = CategoryRepository::new(state.pool())
        .autocomplete(q, MAX_CATEGORY_SUGGESTIONS)
        .await?;

    Ok(Json(AutocompleteResponse {
        suggestions: Suggestions {
            products,
            categories,
        },
    }))
}
