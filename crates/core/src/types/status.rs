//! Status and choice enums stored as PostgreSQL enum types.

use serde::{Deserialize, Serialize};

/// Order lifecycle.
///
/// Orders start as `New` when placed from the cart and are moved forward by
/// staff. `Dropped` is terminal and can happen from any earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    New,
    Billed,
    Processed,
    Shipped,
    Completed,
    Dropped,
}

impl OrderStatus {
    /// Human readable label shown to customers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "New order",
            Self::Billed => "Billed",
            Self::Processed => "Processed",
            Self::Shipped => "Shipped",
            Self::Completed => "Completed",
            Self::Dropped => "Dropped",
        }
    }

    /// Whether the order has reached a final state.
    #[must_use]
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Completed | Self::Dropped)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Contact message workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.contact_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    #[default]
    New,
    Reading,
    Replied,
    Closed,
}

/// Newsletter subscription state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.subscription_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Unsubscribed,
}

/// Topic picked on the contact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.contact_subject", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ContactSubject {
    #[default]
    General,
    Order,
    Product,
    Shipping,
    Returns,
    Other,
}

impl ContactSubject {
    /// Every subject, in form order.
    pub const ALL: [Self; 6] = [
        Self::General,
        Self::Order,
        Self::Product,
        Self::Shipping,
        Self::Returns,
        Self::Other,
    ];

    /// Form value.
    #[must_use]
    pub const fn value(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Order => "order",
            Self::Product => "product",
            Self::Shipping => "shipping",
            Self::Returns => "returns",
            Self::Other => "other",
        }
    }

    /// Form label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::General => "General Inquiry",
            Self::Order => "Order Support",
            Self::Product => "Product Question",
            Self::Shipping => "Shipping & Delivery",
            Self::Returns => "Returns & Exchanges",
            Self::Other => "Other",
        }
    }
}

impl std::str::FromStr for ContactSubject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|subject| subject.value() == s)
            .ok_or_else(|| format!("invalid contact subject: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_status_labels() {
        assert_eq!(OrderStatus::default(), OrderStatus::New);
        assert_eq!(OrderStatus::New.to_string(), "New order");
        assert!(OrderStatus::Dropped.is_final());
        assert!(!OrderStatus::Shipped.is_final());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Unsubscribed).unwrap(),
            "\"unsubscribed\""
        );
        assert_eq!(
            serde_json::from_str::<ContactStatus>("\"replied\"").unwrap(),
            ContactStatus::Replied
        );
    }

    #[test]
    fn test_contact_subject_parse() {
        assert_eq!("returns".parse::<ContactSubject>().unwrap(), ContactSubject::Returns);
        assert!("billing".parse::<ContactSubject>().is_err());
        for subject in ContactSubject::ALL {
            assert_eq!(subject.value().parse::<ContactSubject>().unwrap(), subject);
        }
    }
}
