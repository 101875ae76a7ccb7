//! Product listing, search and category pages.
//!
//! All three render the same listing. Filters come from the query string and
//! anything unparseable is ignored rather than rejected, so a hand-edited URL
//! still shows products.

use std::str::FromStr;
use std::sync::Arc;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;

use super::PageContext;
use crate::db::{ProductFilters, ProductRepository, ProductSort};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::non_blank;
use crate::models::{Category, Page, PriceRange, ProductCard};
use crate::state::AppState;

/// Listing query parameters, kept as strings so bad values can be dropped.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    /// Alias of `search` used by the header search box.
    pub q: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

impl ListingQuery {
    /// Filters to apply. `search` wins over `q` when both are present.
    fn filters(&self) -> ProductFilters {
        ProductFilters {
            category: non_blank(self.category.as_deref()).map(str::to_owned),
            search: non_blank(self.search.as_deref())
                .or_else(|| non_blank(self.q.as_deref()))
                .map(str::to_owned),
            min_price: parse_price(self.min_price.as_deref()),
            max_price: parse_price(self.max_price.as_deref()),
        }
    }

    fn sort(&self) -> ProductSort {
        ProductSort::from_param(self.sort.as_deref())
    }

    fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

/// A non-negative decimal, or `None` for blank or invalid input.
fn parse_price(raw: Option<&str>) -> Option<Decimal> {
    non_blank(raw)
        .and_then(|v| Decimal::from_str(v).ok())
        .filter(|d| !d.is_sign_negative())
}

/// One entry of the sort dropdown.
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "catalog/listing.html")]
pub struct ListingTemplate {
    pub page: PageContext,
    pub heading: String,
    pub products: Page<ProductCard>,
    pub categories: Arc<Vec<Category>>,
    pub price_range: PriceRange,
    pub filters: ProductFilters,
    pub sort_options: Vec<SortOption>,
    /// Path the filter form and pager links point at.
    pub base_path: String,
    pub focus_search: bool,
    sort: ProductSort,
}

impl ListingTemplate {
    /// Link to page `number` keeping the active filters and sort.
    #[must_use]
    pub fn page_href(&self, number: i64) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if !self.base_path.starts_with("/categories/")
            && let Some(category) = &self.filters.category
        {
            query.append_pair("category", category);
        }
        if let Some(search) = &self.filters.search {
            query.append_pair("search", search);
        }
        if let Some(min) = self.filters.min_price {
            query.append_pair("min_price", &min.to_string());
        }
        if let Some(max) = self.filters.max_price {
            query.append_pair("max_price", &max.to_string());
        }
        if self.sort != ProductSort::default() {
            query.append_pair("sort", self.sort.param());
        }
        query.append_pair("page", &number.to_string());
        format!("{}?{}", self.base_path, query.finish())
    }

    /// Whether `slug` is the category being filtered on.
    #[must_use]
    pub fn is_selected_category(&self, slug: &str) -> bool {
        self.filters.category.as_deref() == Some(slug)
    }

    /// Search box value.
    #[must_use]
    pub fn search_value(&self) -> &str {
        self.filters.search.as_deref().unwrap_or_default()
    }

    /// Min price box value.
    #[must_use]
    pub fn min_price_value(&self) -> String {
        self.filters.min_price.map(|d| d.to_string()).unwrap_or_default()
    }

    /// Max price box value.
    #[must_use]
    pub fn max_price_value(&self) -> String {
        self.filters.max_price.map(|d| d.to_string()).unwrap_or_default()
    }
}

struct Listing {
    heading: String,
    base_path: String,
    focus_search: bool,
}

async fn render_listing(
    state: &AppState,
    page: PageContext,
    query: &ListingQuery,
    filters: ProductFilters,
    listing: Listing,
) -> Result<ListingTemplate> {
    let sort = query.sort();
    let products = ProductRepository::new(state.pool())
        .search(&filters, sort, query.page())
        .await?;
    let categories = state.catalog().categories(state.pool()).await?;
    let price_range = state.catalog().price_range(state.pool()).await?;

    Ok(ListingTemplate {
        page,
        heading: listing.heading,
        products,
        categories,
        price_range,
        filters,
        sort_options: ProductSort::ALL
            .into_iter()
            .map(|s| SortOption {
                value: s.param(),
                label: s.label(),
                selected: s == sort,
            })
            .collect(),
        base_path: listing.base_path,
        focus_search: listing.focus_search,
        sort,
    })
}

/// Display the product listing.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let filters = query.filters();
    let heading = match &filters.search {
        Some(term) => format!("Results for \u{201c}{term}\u{201d}"),
        None => "All products".to_string(),
    };
    render_listing(
        &state,
        page,
        &query,
        filters,
        Listing {
            heading,
            base_path: "/".to_string(),
            focus_search: false,
        },
    )
    .await
}

/// Display the listing with the search box focused.
#[instrument(skip(state, page))]
pub async fn search(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let filters = query.filters();
    let heading = match &filters.search {
        Some(term) => format!("Results for \u{201c}{term}\u{201d}"),
        None => "Search".to_string(),
    };
    render_listing(
        &state,
        page,
        &query,
        filters,
        Listing {
            heading,
            base_path: "/search".to_string(),
            focus_search: true,
        },
    )
    .await
}

/// Display the listing for one category.
#[instrument(skip(state, page, query))]
pub async fn category(
    State(state): State<AppState>,
    page: PageContext,
    Path(slug): Path<String>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse> {
    let categories = state.catalog().categories(state.pool()).await?;
    let category = categories
        .iter()
        .find(|c| c.slug == slug)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Category {slug}")))?;

    let filters = ProductFilters {
        category: Some(category.slug.clone()),
        ..query.filters()
    };
    render_listing(
        &state,
        page,
        &query,
        filters,
        Listing {
            heading: category.title,
            base_path: format!("/categories/{}", category.slug),
            focus_search: false,
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> ListingQuery {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        let uri: axum::http::Uri = format!("/?{encoded}").parse().unwrap_or_default();
        Query::<ListingQuery>::try_from_uri(&uri)
            .map(|Query(q)| q)
            .unwrap_or_default()
    }

    #[test]
    fn test_invalid_prices_are_ignored() {
        let q = query(&[("min_price", "abc"), ("max_price", "-3"), ("page", "x")]);
        let filters = q.filters();
        assert_eq!(filters.min_price, None);
        assert_eq!(filters.max_price, None);
        assert_eq!(q.page(), 1);
    }

    #[test]
    fn test_search_alias_and_blank_values() {
        let q = query(&[("q", " tiles "), ("category", "  ")]);
        let filters = q.filters();
        assert_eq!(filters.search.as_deref(), Some("tiles"));
        assert_eq!(filters.category, None);

        let q = query(&[("q", "tiles"), ("search", "plates")]);
        assert_eq!(q.filters().search.as_deref(), Some("plates"));
    }

    #[test]
    fn test_valid_filters() {
        let q = query(&[
            ("category", "bricks"),
            ("min_price", "1.50"),
            ("max_price", "20"),
            ("sort", "-price"),
            ("page", "3"),
        ]);
        let filters = q.filters();
        assert_eq!(filters.category.as_deref(), Some("bricks"));
        assert_eq!(filters.min_price, Some(Decimal::new(150, 2)));
        assert_eq!(filters.max_price, Some(Decimal::new(20, 0)));
        assert_eq!(q.sort(), ProductSort::PriceDesc);
        assert_eq!(q.page(), 3);
    }

    #[test]
    fn test_unknown_sort_falls_back() {
        assert_eq!(query(&[("sort", "stock")]).sort(), ProductSort::Newest);
    }

    #[test]
    fn test_page_href_keeps_filters() {
        let template = ListingTemplate {
            page: PageContext::default(),
            heading: String::new(),
            products: Page {
                items: Vec::new(),
                number: 1,
                total_pages: 3,
                total_items: 30,
            },
            categories: Arc::new(Vec::new()),
            price_range: PriceRange::default(),
            filters: ProductFilters {
                category: Some("bricks".into()),
                search: Some("red 2x4".into()),
                min_price: Some(Decimal::new(5, 0)),
                max_price: None,
            },
            sort_options: Vec::new(),
            base_path: "/".into(),
            focus_search: false,
            sort: ProductSort::PriceAsc,
        };
        assert_eq!(
            template.page_href(2),
            "/?category=bricks&search=red+2x4&min_price=5&sort=price&page=2"
        );
    }
}
