//! URL slugs for categories and products.

use core::fmt;

use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug cannot be empty")]
    Empty,
    #[error("slug must be at most {max} characters")]
    TooLong { max: usize },
    #[error("slug may only contain lowercase letters, digits, hyphens and underscores")]
    InvalidCharacter,
}

/// A URL-safe identifier: lowercase ASCII letters, digits, `-` and `_`.
///
/// ```
/// use bricky_core::Slug;
///
/// assert_eq!(Slug::slugify("Technic Gears & Axles!").unwrap().as_str(), "technic-gears-axles");
/// assert!(Slug::parse("Has Spaces").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    pub const MAX_LENGTH: usize = 200;

    /// Validate an existing slug.
    ///
    /// # Errors
    ///
    /// Returns a [`SlugError`] if the input is empty, too long, or has
    /// characters outside the slug alphabet.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(SlugError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if !s
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
        {
            return Err(SlugError::InvalidCharacter);
        }
        Ok(Self(s.to_owned()))
    }

    /// Derive a slug from a display name.
    ///
    /// Non-ASCII and punctuation are dropped, runs of whitespace and hyphens
    /// collapse to a single `-`, and leading/trailing separators are removed.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] when nothing usable remains.
    pub fn slugify(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        let mut pending_dash = false;
        for c in name.chars() {
            if c.is_ascii_alphanumeric() || c == '_' {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            } else if c.is_whitespace() || c == '-' {
                pending_dash = true;
            }
        }
        let trimmed = out.trim_matches(|c| c == '-' || c == '_');
        let truncated: String = trimmed.chars().take(Self::MAX_LENGTH).collect();
        Self::parse(truncated.trim_end_matches('-'))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Slug {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Slug {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Slug {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(Slug::slugify("Red 2x4 Brick").unwrap().as_str(), "red-2x4-brick");
        assert_eq!(Slug::slugify("  --Space -- Shuttle  ").unwrap().as_str(), "space-shuttle");
        assert_eq!(Slug::slugify("Café Set").unwrap().as_str(), "caf-set");
        assert_eq!(Slug::slugify("!!!"), Err(SlugError::Empty));
    }

    #[test]
    fn test_parse() {
        assert!(Slug::parse("classic-bricks_2").is_ok());
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
        assert_eq!(Slug::parse("Upper"), Err(SlugError::InvalidCharacter));
        assert_eq!(Slug::parse("a b"), Err(SlugError::InvalidCharacter));
    }

    #[test]
    fn test_slugify_truncates() {
        let long = "a".repeat(300);
        assert_eq!(Slug::slugify(&long).unwrap().as_str().len(), Slug::MAX_LENGTH);
    }
}
