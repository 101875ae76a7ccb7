//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::CatalogCache;
use crate::config::StorefrontConfig;
use crate::services::email::EmailService;
use crate::services::verification::VerificationTokens;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    email: EmailService,
    tokens: VerificationTokens,
    catalog: CatalogCache,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(
        config: StorefrontConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let email = EmailService::new(&config.email)?;
        Ok(Self::with_email(config, pool, email))
    }

    /// Create state with an explicit email service (tests use the console backend).
    #[must_use]
    pub fn with_email(config: StorefrontConfig, pool: PgPool, email: EmailService) -> Self {
        let tokens = VerificationTokens::new(config.secret_key.clone(), config.verification_ttl);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                tokens,
                catalog: CatalogCache::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the verification token generator.
    #[must_use]
    pub fn tokens(&self) -> &VerificationTokens {
        &self.inner.tokens
    }

    /// Get a reference to the catalog cache.
    #[must_use]
    pub fn catalog(&self) -> &CatalogCache {
        &self.inner.catalog
    }
}
