//! Non-negative money amounts in the store currency.
//!
//! Prices are stored as `NUMERIC(8,2)` and carried as [`Decimal`] so that
//! totals never pick up floating point error.

use core::fmt;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// Negative amount.
    #[error("price cannot be negative")]
    Negative,
    /// More digits than `NUMERIC(8,2)` holds.
    #[error("price must be below {max}")]
    TooLarge {
        /// Exclusive upper bound.
        max: Decimal,
    },
    /// Not a decimal number.
    #[error("price is not a valid number")]
    Invalid,
}

/// A price in dollars, always rounded to cents.
///
/// ```
/// use bricky_core::Price;
/// use rust_decimal::Decimal;
///
/// let price = Price::new(Decimal::new(1999, 2)).unwrap();
/// assert_eq!(price.to_string(), "$19.99");
/// assert!(Price::new(Decimal::new(-1, 0)).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero dollars.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest value `NUMERIC(8,2)` accepts, plus one cent.
    #[must_use]
    pub fn upper_bound() -> Decimal {
        Decimal::new(1_000_000, 0)
    }

    /// Create a price, rounding to cents.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is negative or does not fit `NUMERIC(8,2)`.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven);
        if rounded >= Self::upper_bound() {
            return Err(PriceError::TooLarge {
                max: Self::upper_bound(),
            });
        }
        Ok(Self(rounded))
    }

    /// Create a price from a whole number of cents.
    ///
    /// # Errors
    ///
    /// Same as [`Price::new`].
    pub fn from_cents(cents: i64) -> Result<Self, PriceError> {
        Self::new(Decimal::new(cents, 2))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount formatted with two decimals and no currency sign.
    #[must_use]
    pub fn plain(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl std::str::FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let amount: Decimal = s.trim().parse().map_err(|_| PriceError::Invalid)?;
        Self::new(amount)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(1999).unwrap().to_string(), "$19.99");
        assert_eq!(Price::new(Decimal::new(5, 0)).unwrap().to_string(), "$5.00");
        assert_eq!(Price::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_rounds_to_cents_half_even() {
        assert_eq!(Price::new(Decimal::new(10_125, 3)).unwrap().plain(), "10.12");
        assert_eq!(Price::new(Decimal::new(10_135, 3)).unwrap().plain(), "10.14");
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::from_cents(-1), Err(PriceError::Negative));
    }

    #[test]
    fn test_rejects_overflow() {
        assert!(matches!(
            Price::new(Decimal::new(1_000_000, 0)),
            Err(PriceError::TooLarge { .. })
        ));
        assert!(Price::new(Decimal::new(99_999_999, 2)).is_ok());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("12.50".parse::<Price>().unwrap().plain(), "12.50");
        assert_eq!("abc".parse::<Price>(), Err(PriceError::Invalid));
    }
}
