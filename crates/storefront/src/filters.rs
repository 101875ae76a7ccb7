//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;
use std::str::FromStr;

use rust_decimal::Decimal;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Versioned URL for a file under `/static`.
///
/// The stylesheet and the storefront script carry a `?v=` content version
/// computed by `build.rs`; other files are linked as-is.
///
/// Usage in templates: `{{ "css/main.css"|static_url }}`
#[askama::filter_fn]
pub fn static_url(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(versioned_static_url(&value.to_string()))
}

fn versioned_static_url(path: &str) -> String {
    let path = path.trim_start_matches('/');
    let version = match path {
        "css/main.css" => Some(env!("BRICKY_CSS_VERSION")),
        "js/storefront.js" => Some(env!("BRICKY_JS_VERSION")),
        _ => None,
    };
    match version {
        Some(v) => format!("/static/{path}?v={v}"),
        None => format!("/static/{path}"),
    }
}

/// Formats an amount as dollars with two decimals.
///
/// Usage in templates: `{{ product.price|money }}` → `$19.99`
#[askama::filter_fn]
pub fn money(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format_money(&value.to_string()))
}

fn format_money(raw: &str) -> String {
    Decimal::from_str(raw).map_or_else(
        |_| raw.to_string(),
        |amount| format!("${:.2}", amount.round_dp(2)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_money() {
        assert_eq!(format_money("19.9"), "$19.90");
        assert_eq!(format_money("0"), "$0.00");
        assert_eq!(format_money("1234.567"), "$1234.57");
        assert_eq!(format_money("n/a"), "n/a");
    }

    #[test]
    fn test_versioned_static_url() {
        let css = versioned_static_url("css/main.css");
        assert_eq!(css, format!("/static/css/main.css?v={}", env!("BRICKY_CSS_VERSION")));
        assert_eq!(env!("BRICKY_CSS_VERSION").len(), 10);
        assert!(versioned_static_url("/js/storefront.js").starts_with("/static/js/storefront.js?v="));
        assert_eq!(versioned_static_url("img/placeholder.svg"), "/static/img/placeholder.svg");
    }
}
