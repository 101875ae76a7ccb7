//! Customer profile repository.

use sqlx::{PgConnection, PgPool};

use bricky_core::{CustomerId, UserId};

use super::RepositoryError;
use crate::models::Customer;

/// Repository for customer profile operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
    /// Create a new customer repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's customer profile, creating an empty one if missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Customer, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_or_create_in(&mut conn, user_id).await
    }

    /// Overwrite phone and address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the profile does not exist.
    pub async fn update_contact(
        &self,
        id: CustomerId,
        phone: Option<&str>,
        address: &str,
    ) -> Result<Customer, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        update_contact_in(&mut conn, id, phone, address).await
    }
}

/// [`CustomerRepository::get_or_create`] on an existing connection or transaction.
pub(crate) async fn get_or_create_in(
    conn: &mut PgConnection,
    user_id: UserId,
) -> Result<Customer, RepositoryError> {
    let customer = sqlx::query_as::<_, Customer>(
        r"
        INSERT INTO storefront.customers (id, user_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
        RETURNING id, user_id, phone, address
        ",
    )
    .bind(CustomerId::generate())
    .bind(user_id)
    .fetch_one(conn)
    .await?;

    Ok(customer)
}

/// [`CustomerRepository::update_contact`] on an existing connection or transaction.
pub(crate) async fn update_contact_in(
    conn: &mut PgConnection,
    id: CustomerId,
    phone: Option<&str>,
    address: &str,
) -> Result<Customer, RepositoryError> {
    sqlx::query_as::<_, Customer>(
        r"
        UPDATE storefront.customers
        SET phone = COALESCE($2, phone), address = $3
        WHERE id = $1
        RETURNING id, user_id, phone, address
        ",
    )
    .bind(id)
    .bind(phone)
    .bind(address)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}
