//! Contact message repository.

use sqlx::PgPool;

use bricky_core::ContactMessageId;

use super::RepositoryError;
use crate::models::{ContactMessage, NewContactMessage};

/// Repository for contact messages.
pub struct ContactRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ContactRepository<'a> {
    /// Create a new contact repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store a message with status `new`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, message: &NewContactMessage) -> Result<ContactMessage, RepositoryError> {
        let stored = sqlx::query_as::<_, ContactMessage>(
            r"
            INSERT INTO storefront.contact_messages (id, name, email, phone, subject, message)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, email, phone, subject, message, status, reply, replied_at,
                      created_at, updated_at
            ",
        )
        .bind(ContactMessageId::generate())
        .bind(&message.name)
        .bind(&message.email)
        .bind(message.phone.as_deref())
        .bind(message.subject)
        .bind(&message.message)
        .fetch_one(self.pool)
        .await?;

        Ok(stored)
    }
}
