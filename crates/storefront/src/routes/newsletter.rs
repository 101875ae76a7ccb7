//! Newsletter subscription route handlers.
//!
//! The footer form posts to `/newsletter/subscribe` and swaps itself for the
//! returned fragment; `/api/newsletter/*` serve the same operations as JSON.
//! Addresses are trimmed and lower-cased before storage. Subscribing an
//! address that is already active counts as success.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use bricky_core::Email;

use crate::db::NewsletterRepository;
use crate::db::newsletter::SubscribeOutcome;
use crate::error::ApiError;
use crate::state::AppState;

const INVALID_EMAIL: &str = "Please enter a valid email address.";

/// Newsletter subscription form data.
#[derive(Debug, Deserialize)]
pub struct SubscribeForm {
    #[serde(default)]
    pub email: String,
}

/// Success fragment template (replaces the footer form).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/subscribe_success.html")]
pub struct SubscribeSuccessTemplate {
    pub email: String,
}

/// Error fragment template (replaces the footer form).
#[derive(Template, WebTemplate)]
#[template(path = "newsletter/subscribe_error.html")]
pub struct SubscribeErrorTemplate {
    pub message: String,
    pub email: String,
}

/// JSON response for the API endpoints.
#[derive(Debug, Serialize)]
pub struct NewsletterResponse {
    pub success: bool,
    pub message: &'static str,
}

fn success_message(outcome: SubscribeOutcome) -> &'static str {
    match outcome {
        SubscribeOutcome::Created => "Thanks for subscribing!",
        SubscribeOutcome::Reactivated => "Welcome back! You're subscribed again.",
        SubscribeOutcome::AlreadyActive => "You're already subscribed.",
    }
}

/// Subscribe from the footer form.
#[instrument(skip_all)]
pub async fn subscribe(State(state): State<AppState>, Form(form): Form<SubscribeForm>) -> Response {
    let Ok(email) = Email::parse(&form.email) else {
        return (
            StatusCode::BAD_REQUEST,
            SubscribeErrorTemplate {
                message: INVALID_EMAIL.to_string(),
                email: form.email.trim().to_string(),
            },
        )
            .into_response();
    };

    match NewsletterRepository::new(state.pool()).subscribe(&email).await {
        Ok(outcome) => {
            tracing::info!(?outcome, "Newsletter subscription");
            SubscribeSuccessTemplate {
                email: email.into_inner(),
            }
            .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Newsletter subscription failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                SubscribeErrorTemplate {
                    message: "Something went wrong. Please try again.".to_string(),
                    email: email.into_inner(),
                },
            )
                .into_response()
        }
    }
}

/// Subscribe (JSON).
#[instrument(skip_all)]
pub async fn api_subscribe(
    State(state): State<AppState>,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<NewsletterResponse>, ApiError> {
    let email = Email::parse(&form.email).map_err(|_| ApiError::bad_request(INVALID_EMAIL))?;
    let outcome = NewsletterRepository::new(state.pool()).subscribe(&email).await?;
    tracing::info!(?outcome, "Newsletter subscription");

    Ok(Json(NewsletterResponse {
        success: true,
        message: success_message(outcome),
    }))
}

/// Unsubscribe (JSON). Unknown addresses get a 404.
#[instrument(skip_all)]
pub async fn api_unsubscribe(
    State(state): State<AppState>,
    Form(form): Form<SubscribeForm>,
) -> Result<Json<NewsletterResponse>, ApiError> {
    let email = Email::parse(&form.email).map_err(|_| ApiError::bad_request(INVALID_EMAIL))?;
    if !NewsletterRepository::new(state.pool()).unsubscribe(&email).await? {
        return Err(ApiError::not_found("This email is not subscribed."));
    }

    Ok(Json(NewsletterResponse {
        success: true,
        message: "You have been unsubscribed.",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_messages() {
        assert_eq!(success_message(SubscribeOutcome::Created), "Thanks for subscribing!");
        assert_eq!(
            success_message(SubscribeOutcome::AlreadyActive),
            "You're already subscribed."
        );
    }

    #[test]
    fn test_error_fragment_keeps_input() {
        let html = SubscribeErrorTemplate {
            message: INVALID_EMAIL.to_string(),
            email: "builder@".to_string(),
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("builder@"));
        assert!(html.contains(INVALID_EMAIL));
    }
}
