//! Cart and order totals.
//!
//! The cart page, the cart JSON endpoints, checkout and order placement all
//! price through [`OrderTotals`] so the numbers a customer sees are the
//! numbers that get stored.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

/// Flat shipping fee charged on any non-empty order.
#[must_use]
pub fn shipping_fee() -> Decimal {
    Decimal::new(1000, 2)
}

/// Sales tax rate applied to the subtotal.
#[must_use]
pub fn tax_rate() -> Decimal {
    Decimal::new(10, 2)
}

/// Round to cents, ties to even.
#[must_use]
pub fn round_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Unit price times quantity.
#[must_use]
pub fn line_total(price: Decimal, quantity: i32) -> Decimal {
    round_cents(price * Decimal::from(quantity))
}

/// Subtotal, shipping, tax and grand total for a set of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl OrderTotals {
    /// Totals for an already summed subtotal.
    ///
    /// An empty cart (zero subtotal) ships for free so that it totals `0.00`.
    #[must_use]
    pub fn from_subtotal(subtotal: Decimal) -> Self {
        let subtotal = round_cents(subtotal);
        let shipping = if subtotal > Decimal::ZERO {
            shipping_fee()
        } else {
            Decimal::ZERO
        };
        let tax = round_cents(subtotal * tax_rate());
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal + shipping + tax,
        }
    }

    /// Totals for `(unit price, quantity)` pairs.
    #[must_use]
    pub fn from_lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = (Decimal, i32)>,
    {
        let subtotal = lines
            .into_iter()
            .map(|(price, quantity)| line_total(price, quantity))
            .sum();
        Self::from_subtotal(subtotal)
    }

    /// All zeros.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_subtotal(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap_or_default()
    }

    #[test]
    fn test_basic_totals() {
        let totals = OrderTotals::from_lines([(d("19.99"), 2), (d("5.00"), 1)]);
        assert_eq!(totals.subtotal, d("44.98"));
        assert_eq!(totals.shipping, d("10.00"));
        assert_eq!(totals.tax, d("4.50"));
        assert_eq!(totals.total, d("59.48"));
    }

    #[test]
    fn test_empty_cart_is_free() {
        let totals = OrderTotals::empty();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.shipping, Decimal::ZERO);
        assert_eq!(totals.tax, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_tax_rounds_half_even() {
        // 0.25 * 0.10 = 0.025 -> 0.02
        assert_eq!(OrderTotals::from_subtotal(d("0.25")).tax, d("0.02"));
        // 0.35 * 0.10 = 0.035 -> 0.04
        assert_eq!(OrderTotals::from_subtotal(d("0.35")).tax, d("0.04"));
        // 12.345 subtotal never happens from NUMERIC(8,2), but still rounds
        assert_eq!(OrderTotals::from_subtotal(d("12.345")).subtotal, d("12.34"));
    }

    #[test]
    fn test_total_is_sum_of_parts() {
        for sub in ["0.01", "1.00", "99.95", "1234.56"] {
            let t = OrderTotals::from_subtotal(d(sub));
            assert_eq!(t.total, t.subtotal + t.shipping + t.tax);
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(d("2.50"), 3), d("7.50"));
        assert_eq!(line_total(d("2.50"), 0), Decimal::ZERO);
    }
}
