//! Account route handlers.
//!
//! Handles registration, login/logout and email verification. Accounts are
//! created unverified; the emailed link at `/users/verify-email/{uid}/{token}`
//! flips the flag, after which the user can log in.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bricky_core::Email;

use super::PageContext;
use crate::db::UserRepository;
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::forms::FieldErrors;
use crate::middleware::{clear_current_user, flash, set_current_user};
use crate::models::{CurrentUser, FlashLevel, User};
use crate::services::AuthService;
use crate::services::auth::{AuthError, RegistrationInput, validate_registration};
use crate::services::verification::decode_uid;
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Registration form data.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub phone: Option<String>,
}

/// Login form data.
#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    pub next: Option<String>,
}

/// Resend verification form data.
#[derive(Debug, Deserialize)]
pub struct ResendForm {
    #[serde(default)]
    pub email: String,
}

/// Query parameters for the login page.
#[derive(Debug, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/register.html")]
pub struct RegisterTemplate {
    pub page: PageContext,
    pub form: RegisterForm,
    pub errors: FieldErrors,
}

/// Shown after registering: check your inbox.
#[derive(Template, WebTemplate)]
#[template(path = "users/register_done.html")]
pub struct RegisterDoneTemplate {
    pub page: PageContext,
    pub email: String,
    /// The email could not be sent; point at the resend form.
    pub email_failed: bool,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/login.html")]
pub struct LoginTemplate {
    pub page: PageContext,
    pub username: String,
    pub next: String,
    pub errors: FieldErrors,
    pub error: Option<String>,
    /// Offer the resend link (password was right, email not verified).
    pub unverified: bool,
}

/// Verification result page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/verify_result.html")]
pub struct VerifyResultTemplate {
    pub page: PageContext,
    pub verified: bool,
    pub already_verified: bool,
}

/// Resend verification page template.
#[derive(Template, WebTemplate)]
#[template(path = "users/resend.html")]
pub struct ResendTemplate {
    pub page: PageContext,
    pub sent: bool,
}

// =============================================================================
// Helpers
// =============================================================================

/// Only same-site absolute paths are followed after login.
///
/// Browsers drop tabs and newlines inside URLs, so `/\t/host` would become
/// `//host`; any control character sends the user home instead.
fn safe_next(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Email a fresh verification link. Returns whether it went out.
async fn send_verification(state: &AppState, user: &User) -> bool {
    let link = state
        .tokens()
        .link_for(&state.config().base_url, user, Utc::now());
    match state
        .email()
        .send_verification_email(user.email.as_str(), user.username.as_str(), &link)
        .await
    {
        Ok(()) => true,
        Err(e) => {
            tracing::error!(error = %e, user_id = %user.id, "Failed to send verification email");
            false
        }
    }
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(page: PageContext) -> impl IntoResponse {
    RegisterTemplate {
        page,
        form: RegisterForm::default(),
        errors: FieldErrors::new(),
    }
}

/// Handle registration form submission.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    let input = RegistrationInput {
        username: &form.username,
        email: &form.email,
        password: &form.password,
        confirm_password: &form.confirm_password,
        phone: form.phone.as_deref(),
    };

    let registered = match validate_registration(&input) {
        Ok(registration) => AuthService::new(state.pool()).register(&registration).await,
        Err(errors) => Err(AuthError::Invalid(errors)),
    };

    let user = match registered {
        Ok(user) => user,
        Err(AuthError::Invalid(errors)) => {
            let template = RegisterTemplate {
                page,
                form: RegisterForm {
                    password: String::new(),
                    confirm_password: String::new(),
                    ..form
                },
                errors,
            };
            return Ok((StatusCode::BAD_REQUEST, template).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, "Account registered");
    let sent = send_verification(&state, &user).await;

    Ok(RegisterDoneTemplate {
        page,
        email: user.email.into_inner(),
        email_failed: !sent,
    }
    .into_response())
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(page: PageContext, Query(query): Query<NextQuery>) -> impl IntoResponse {
    LoginTemplate {
        page,
        username: String::new(),
        next: safe_next(query.next.as_deref()),
        errors: FieldErrors::new(),
        error: None,
        unverified: false,
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    page: PageContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref());

    let user = match AuthService::new(state.pool())
        .login(&form.username, &form.password)
        .await
    {
        Ok(user) => user,
        Err(err @ (AuthError::Invalid(_) | AuthError::InvalidCredentials | AuthError::EmailNotVerified)) => {
            let app_err = AppError::from(err);
            let status = app_err.status();
            let unverified = matches!(app_err, AppError::Auth(AuthError::EmailNotVerified));
            let (errors, error) = match app_err {
                AppError::Auth(AuthError::Invalid(errors)) => (errors, None),
                other => (FieldErrors::new(), Some(other.public_message())),
            };
            tracing::info!(status = %status, "Login rejected");
            let template = LoginTemplate {
                page,
                username: form.username.trim().to_string(),
                next,
                errors,
                error,
                unverified,
            };
            return Ok((status, template).into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let current = CurrentUser::from(&user);
    set_current_user(&session, &current).await?;
    set_sentry_user(&user.id, Some(&current.username));
    flash(
        &session,
        FlashLevel::Success,
        format!("Welcome back, {}!", current.username),
    )
    .await;

    tracing::info!(user_id = %user.id, "Logged in");
    Ok(Redirect::to(&next).into_response())
}

/// Handle logout.
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Verification Routes
// =============================================================================

/// Follow a verification link.
///
/// Malformed, unknown, expired or already-used links all render the same
/// failure page with a 400 so the link itself reveals nothing.
#[instrument(skip_all)]
pub async fn verify_email(
    State(state): State<AppState>,
    page: PageContext,
    Path((uidb64, token)): Path<(String, String)>,
) -> Result<Response> {
    let failed = |page| {
        (
            StatusCode::BAD_REQUEST,
            VerifyResultTemplate {
                page,
                verified: false,
                already_verified: false,
            },
        )
            .into_response()
    };

    let Some(user_id) = decode_uid(&uidb64) else {
        tracing::info!("Verification link with malformed uid");
        return Ok(failed(page));
    };

    let users = UserRepository::new(state.pool());
    let Some(user) = users.get_by_id(user_id).await? else {
        tracing::info!(user_id = %user_id, "Verification link for unknown user");
        return Ok(failed(page));
    };

    if user.email_is_verified {
        return Ok(VerifyResultTemplate {
            page,
            verified: true,
            already_verified: true,
        }
        .into_response());
    }

    if !state.tokens().check_token(&user, &token, Utc::now()) {
        tracing::info!(user_id = %user.id, "Invalid or expired verification token");
        return Ok(failed(page));
    }

    users.mark_verified(user.id).await?;
    tracing::info!(user_id = %user.id, "Email verified");

    Ok(VerifyResultTemplate {
        page,
        verified: true,
        already_verified: false,
    }
    .into_response())
}

/// Display the resend verification form.
pub async fn resend_page(page: PageContext) -> impl IntoResponse {
    ResendTemplate { page, sent: false }
}

/// Send a new verification link.
///
/// The response is identical whether or not the address belongs to an
/// unverified account.
#[instrument(skip_all)]
pub async fn resend_verification(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<ResendForm>,
) -> Result<Response> {
    if let Ok(email) = Email::parse(&form.email)
        && let Some(user) = UserRepository::new(state.pool()).get_by_email(&email).await?
        && !user.email_is_verified
        && user.is_active
    {
        send_verification(&state, &user).await;
    }

    Ok(ResendTemplate { page, sent: true }.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/checkout")), "/checkout");
        assert_eq!(safe_next(Some("/orders?page=2")), "/orders?page=2");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_safe_next_rejects_control_characters() {
        assert_eq!(safe_next(Some("/\t/evil.example")), "/");
        assert_eq!(safe_next(Some("/\n/evil.example")), "/");
        assert_eq!(safe_next(Some("/cart\r\n")), "/cart");
        assert_eq!(safe_next(Some("/orders\u{0}x")), "/");
    }

    #[test]
    fn test_verify_failure_page_offers_resend() {
        let html = VerifyResultTemplate {
            page: PageContext::default(),
            verified: false,
            already_verified: false,
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("/users/resend-verification"));
    }
}
