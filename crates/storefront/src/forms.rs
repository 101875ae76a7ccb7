//! Per-field validation messages shared by the HTML and JSON form handlers.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Longest phone number accepted on any form.
pub const MAX_PHONE_LENGTH: usize = 32;

/// Digits with optional leading `+` and spaces, dashes or parentheses.
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ()\-]+$").expect("Invalid regex"));

/// Field name → messages, keyed alphabetically by field name.
///
/// Serializes as `{"field": ["message", ...]}` with the keys sorted, so JSON
/// error bodies are stable. Messages for one field keep the order they were
/// added in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// First message recorded for `field`, for inline display.
    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(|m| m.first()).map(String::as_str)
    }

    /// `Ok(value)` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one message was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Trimmed value, or `None` when blank.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Loose phone check: 7 to 15 digits in a conventional layout.
#[must_use]
pub fn is_plausible_phone(phone: &str) -> bool {
    let digits = phone.chars().filter(char::is_ascii_digit).count();
    phone.len() <= MAX_PHONE_LENGTH && (7..=15).contains(&digits) && PHONE_RE.is_match(phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_messages_per_field() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());
        errors.add("title", "Title is required.");
        errors.add("rating", "Rating must be between 1 and 5.");
        errors.add("title", "Title is too long.");

        assert!(errors.has("title"));
        assert_eq!(errors.first("title"), Some("Title is required."));
        assert_eq!(
            serde_json::to_string(&errors).unwrap_or_default(),
            r#"{"rating":["Rating must be between 1 and 5."],"title":["Title is required.","Title is too long."]}"#
        );
    }

    #[test]
    fn test_into_result() {
        assert_eq!(FieldErrors::new().into_result(1), Ok(1));
        assert!(FieldErrors::single("x", "bad").into_result(1).is_err());
    }

    #[test]
    fn test_plausible_phone() {
        assert!(is_plausible_phone("+12125552368"));
        assert!(is_plausible_phone("212-555-2368"));
        assert!(is_plausible_phone("(212) 555 2368"));
        assert!(!is_plausible_phone("12345"));
        assert!(!is_plausible_phone("1+2125552368"));
        assert!(!is_plausible_phone("call me maybe"));
        assert!(!is_plausible_phone(&"1".repeat(40)));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  a ")), Some("a"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }
}
