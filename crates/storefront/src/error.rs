//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. HTML handlers return `Result<T, AppError>`;
//! JSON handlers return `Result<T, ApiError>`, which renders the same error as
//! `{"success": false, "message": ...}`.
//!
//! Server-side failures never reach the client: the response carries a
//! generic message and the cause goes to the log and Sentry.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::forms::FieldErrors;
use crate::services::{AuthError, CartError, CheckoutError, EmailError};

/// Message returned for every 5xx response.
pub const INTERNAL_MESSAGE: &str = "An internal error occurred.";

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart operation failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Email delivery failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Form input failed validation.
    #[error("Please fix the errors below.")]
    Validation(FieldErrors),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Email(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Auth(err) => match err {
                AuthError::Invalid(_) => StatusCode::BAD_REQUEST,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::EmailNotVerified => StatusCode::FORBIDDEN,
                AuthError::UserNotFound => StatusCode::NOT_FOUND,
                AuthError::Repository(_) | AuthError::PasswordHash => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Cart(err) => match err {
                CartError::ProductNotFound | CartError::ItemNotFound => StatusCode::NOT_FOUND,
                CartError::InvalidQuantity | CartError::InsufficientStock { .. } => {
                    StatusCode::BAD_REQUEST
                }
                CartError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Checkout(err) => match err {
                CheckoutError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Message safe to show the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.status().is_server_error() {
            return INTERNAL_MESSAGE.to_string();
        }
        match self {
            Self::Auth(AuthError::Invalid(_)) | Self::Validation(_) => {
                "Please fix the errors below.".to_string()
            }
            Self::Auth(AuthError::InvalidCredentials) => {
                "Invalid username or password.".to_string()
            }
            Self::Auth(AuthError::EmailNotVerified) => {
                "Please verify your email address before logging in.".to_string()
            }
            Self::Auth(err) => err.to_string(),
            Self::Cart(err) => err.to_string(),
            Self::Checkout(err) => err.to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
            Self::RateLimited => "Too many requests. Please try again later.".to_string(),
            _ => INTERNAL_MESSAGE.to_string(),
        }
    }

    /// Per-field messages, when the error carries any.
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation(errors)
            | Self::Auth(AuthError::Invalid(errors))
            | Self::Checkout(CheckoutError::Invalid(errors)) => Some(errors),
            _ => None,
        }
    }

    /// Log and report server-side failures.
    fn capture(&self) {
        if self.status().is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.capture();
        (self.status(), self.public_message()).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// JSON body for a failed API call.
#[derive(Debug, Serialize)]
struct ApiErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<FieldErrors>,
}

/// An `AppError` rendered as JSON for the `/api`, cart and review endpoints.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// A 400 with a plain message.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(AppError::BadRequest(message.into()))
    }

    /// A 404 with a plain message.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self(AppError::NotFound(message.into()))
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

macro_rules! api_error_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for ApiError {
                fn from(err: $source) -> Self {
                    Self(AppError::from(err))
                }
            }
        )*
    };
}

api_error_from!(
    RepositoryError,
    AuthError,
    CartError,
    CheckoutError,
    EmailError,
    tower_sessions::session::Error,
);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        err.capture();
        let body = ApiErrorBody {
            success: false,
            message: err.public_message(),
            errors: err.field_errors().cloned(),
        };
        (err.status(), Json(body)).into_response()
    }
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, username: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            username: username.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn json_body(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::RateLimited),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(CartError::InsufficientStock { available: 2 }.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(CartError::ProductNotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_server_errors_hide_cause() {
        let err = AppError::Internal("connection refused to 10.0.0.5".to_string());
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);

        let err = AppError::Database(RepositoryError::DataCorruption("bad row".into()));
        assert_eq!(err.public_message(), INTERNAL_MESSAGE);
    }

    #[tokio::test]
    async fn test_api_error_json_shape() {
        let (status, body) =
            json_body(CartError::InsufficientStock { available: 3 }.into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body,
            serde_json::json!({
                "success": false,
                "message": "Only 3 items available in stock.",
            })
        );
    }

    #[tokio::test]
    async fn test_api_error_includes_field_errors() {
        let errors = FieldErrors::single("rating", "Rating must be between 1 and 5.");
        let (status, body) = json_body(ApiError(AppError::Validation(errors))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please fix the errors below.");
        assert_eq!(body["errors"]["rating"][0], "Rating must be between 1 and 5.");
    }

    #[tokio::test]
    async fn test_api_internal_error_is_generic() {
        let (status, body) = json_body(ApiError(AppError::Internal("secret".into()))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], INTERNAL_MESSAGE);
    }
}
