//! Cart lines and the priced cart summary.

use rust_decimal::Decimal;
use serde::Serialize;

use bricky_core::{CartItemId, OrderTotals, ProductId, line_total};

/// A cart item joined with the product it refers to.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub product_name: String,
    pub product_slug: String,
    pub picture: Option<String>,
    /// Unit price captured when the item was last added or updated.
    pub price: Decimal,
    pub quantity: i32,
    /// Units the product currently has in stock.
    pub stock: i32,
}

impl CartLine {
    #[must_use]
    pub fn total(&self) -> Decimal {
        line_total(self.price, self.quantity)
    }
}

/// Everything the cart page and cart endpoints report.
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub lines: Vec<CartLine>,
    pub totals: OrderTotals,
    /// Sum of quantities.
    pub count: i64,
}

impl CartSummary {
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let totals = OrderTotals::from_lines(lines.iter().map(|l| (l.price, l.quantity)));
        let count = lines.iter().map(|l| i64::from(l.quantity)).sum();
        Self {
            lines,
            totals,
            count,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(1),
            product_id: ProductId::generate(),
            product_name: "Brick".to_string(),
            product_slug: "brick".to_string(),
            picture: None,
            price: Decimal::new(price, 2),
            quantity,
            stock: 100,
        }
    }

    #[test]
    fn test_summary_counts_quantities() {
        let summary = CartSummary::from_lines(vec![line(250, 2), line(1000, 3)]);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.totals.subtotal, Decimal::new(3500, 2));
        assert_eq!(summary.totals.total, Decimal::new(4850, 2));
    }

    #[test]
    fn test_empty_summary() {
        let summary = CartSummary::from_lines(Vec::new());
        assert!(summary.is_empty());
        assert_eq!(summary.count, 0);
        assert_eq!(summary.totals.total, Decimal::ZERO);
    }
}
