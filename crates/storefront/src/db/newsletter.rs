//! Newsletter subscription repository.

use sqlx::PgPool;

use bricky_core::{Email, SubscriptionId};

use super::RepositoryError;
use crate::models::Subscription;

/// What a subscribe call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// New address added.
    Created,
    /// Previously unsubscribed address switched back on.
    Reactivated,
    /// Address was already active; nothing changed.
    AlreadyActive,
}

/// Repository for newsletter subscriptions.
pub struct NewsletterRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> NewsletterRepository<'a> {
    /// Create a new newsletter repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Subscribe an address, reactivating it if it had unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn subscribe(&self, email: &Email) -> Result<SubscribeOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Subscription>(
            r"
            SELECT id, email, status, subscribed_at, unsubscribed_at
            FROM storefront.newsletter_subscriptions
            WHERE email = $1
            FOR UPDATE
            ",
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = match existing {
            Some(sub) if sub.is_active() => SubscribeOutcome::AlreadyActive,
            Some(sub) => {
                sqlx::query(
                    r"
                    UPDATE storefront.newsletter_subscriptions
                    SET status = 'active', subscribed_at = NOW(), unsubscribed_at = NULL
                    WHERE id = $1
                    ",
                )
                .bind(sub.id)
                .execute(&mut *tx)
                .await?;
                SubscribeOutcome::Reactivated
            }
            None => {
                // A concurrent subscribe of the same address is harmless.
                sqlx::query(
                    r"
                    INSERT INTO storefront.newsletter_subscriptions (id, email)
                    VALUES ($1, $2)
                    ON CONFLICT (email) DO NOTHING
                    ",
                )
                .bind(SubscriptionId::generate())
                .bind(email)
                .execute(&mut *tx)
                .await?;
                SubscribeOutcome::Created
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Mark an address unsubscribed. Returns `false` if it was not active.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unsubscribe(&self, email: &Email) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.newsletter_subscriptions
            SET status = 'unsubscribed', unsubscribed_at = NOW()
            WHERE email = $1 AND status = 'active'
            ",
        )
        .bind(email)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
