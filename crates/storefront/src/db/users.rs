//! User repository for database operations.
//!
//! Usernames and emails are re-validated when rows are read back so that a
//! hand-edited row surfaces as `DataCorruption` instead of leaking through.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use bricky_core::{CustomerId, Email, UserId, Username};

use super::RepositoryError;
use crate::models::User;

const USER_COLUMNS: &str = "id, username, email, phone, password_hash, email_is_verified, \
                            is_active, last_login, date_joined";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: UserId,
    username: String,
    email: String,
    phone: Option<String>,
    password_hash: String,
    email_is_verified: bool,
    is_active: bool,
    last_login: Option<DateTime<Utc>>,
    date_joined: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;
        Ok(Self {
            id: row.id,
            username,
            email,
            phone: row.phone,
            password_hash: row.password_hash,
            email_is_verified: row.email_is_verified,
            is_active: row.is_active,
            last_login: row.last_login,
            date_joined: row.date_joined,
        })
    }
}

/// Fields needed to create an account.
#[derive(Debug)]
pub struct NewUser<'a> {
    pub username: &'a Username,
    pub email: &'a Email,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create an unverified user together with an empty customer profile.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("username")` or
    /// `RepositoryError::Conflict("email")` when either is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new_user: &NewUser<'_>) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO storefront.users (id, username, email, phone, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(UserId::generate())
        .bind(new_user.username.as_str())
        .bind(new_user.email.as_str())
        .bind(new_user.phone)
        .bind(new_user.password_hash)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let field = if db_err.constraint().is_some_and(|c| c.contains("username")) {
                    "username"
                } else {
                    "email"
                };
                return RepositoryError::Conflict(field.to_owned());
            }
            RepositoryError::Database(e)
        })?;

        sqlx::query(
            "INSERT INTO storefront.customers (id, user_id, phone)
             VALUES ($1, $2, $3)",
        )
        .bind(CustomerId::generate())
        .bind(row.id)
        .bind(new_user.phone)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        row.try_into()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("id = $1", id).await
    }

    /// Get a user by exact username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("username = $1", username).await
    }

    /// Get a user by (normalized) email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        self.fetch_one_where("LOWER(email) = $1", email.as_str()).await
    }

    /// Whether a username is already registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn username_taken(&self, username: &str) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.users WHERE username = $1)",
        )
        .bind(username)
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Whether an email is already registered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn email_taken(&self, email: &Email) -> Result<bool, RepositoryError> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM storefront.users WHERE LOWER(email) = $1)",
        )
        .bind(email.as_str())
        .fetch_one(self.pool)
        .await?;
        Ok(taken)
    }

    /// Flag the user's email as verified.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn mark_verified(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.users SET email_is_verified = TRUE WHERE id = $1",
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a successful login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn touch_last_login(&self, id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE storefront.users SET last_login = NOW() WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark every unverified account as verified. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn verify_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.users SET email_is_verified = TRUE WHERE NOT email_is_verified",
        )
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// All users, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.users ORDER BY date_joined DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }

    async fn fetch_one_where<T>(&self, predicate: &str, value: T) -> Result<Option<User>, RepositoryError>
    where
        T: for<'q> sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres> + Send,
    {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM storefront.users WHERE {predicate}"
        ))
        .bind(value)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
