//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! bricky-cli migrate
//! ```
//!
//! Applies `crates/storefront/migrations/` and creates the session table
//! used by `tower-sessions`.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

use tower_sessions_sqlx_store::PostgresStore;

use super::{CliError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    sqlx::migrate!("../storefront/migrations").run(&pool).await?;

    tracing::info!("Creating session store table...");
    PostgresStore::new(pool)
        .migrate()
        .await
        .map_err(|e| CliError::SessionStore(e.to_string()))?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
