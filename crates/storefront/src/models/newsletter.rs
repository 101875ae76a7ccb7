//! Newsletter subscriptions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bricky_core::{SubscriptionId, SubscriptionStatus};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub email: String,
    pub status: SubscriptionStatus,
    pub subscribed_at: DateTime<Utc>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscription {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == SubscriptionStatus::Active
    }
}
