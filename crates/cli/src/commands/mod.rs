//! CLI subcommand implementations.

pub mod email;
pub mod migrate;
pub mod orders;
pub mod reviews;
pub mod seed;
pub mod users;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use bricky_storefront::config::ConfigError;
use bricky_storefront::db::RepositoryError;
use bricky_storefront::services::EmailError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Storefront configuration is incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Session store setup failed.
    #[error("Session store error: {0}")]
    SessionStore(String),

    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Email could not be sent.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// SMTP relay could not be configured.
    #[error("SMTP setup error: {0}")]
    EmailSetup(String),

    /// Catalog file could not be read.
    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Catalog file is not valid YAML for the expected shape.
    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Catalog entries failed validation.
    #[error("{0} catalog validation errors found")]
    InvalidCatalog(usize),

    /// No user matched.
    #[error("No user named {0}")]
    UserNotFound(String),

    /// Free-form argument problem.
    #[error("{0}")]
    Invalid(String),
}

/// Connect to the storefront database named by `STOREFRONT_DATABASE_URL`
/// (or `DATABASE_URL`).
pub async fn connect() -> Result<PgPool, CliError> {
    let _ = dotenvy::dotenv();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))?;

    tracing::info!("Connecting to storefront database...");
    Ok(bricky_storefront::db::create_pool(&database_url).await?)
}
