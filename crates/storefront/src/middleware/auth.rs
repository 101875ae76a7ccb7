//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{Uri, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::error::{ApiError, AppError};
use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a logged-in user.
///
/// HTML requests without a user are redirected to the login page with a
/// `next` parameter; JSON requests get a 401 JSON body.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.username)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin { next: String },
    /// Unauthorized response (for JSON requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { next } => {
                let target = format!("/users/login?next={}", urlencoding::encode(&next));
                Redirect::to(&target).into_response()
            }
            Self::Unauthorized => {
                ApiError(AppError::Unauthorized("Authentication required.".to_string()))
                    .into_response()
            }
        }
    }
}

/// The URI as the client sent it. Nested routers only see the stripped path.
fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |OriginalUri(uri)| uri)
}

/// Whether the caller expects JSON rather than a page.
fn wants_json(parts: &Parts) -> bool {
    let path = request_uri(parts).path();
    if path.starts_with("/api/") || path.starts_with("/cart/") || path.starts_with("/reviews") {
        return true;
    }
    parts
        .headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains("application/json"))
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let rejection = || {
            if wants_json(parts) {
                AuthRejection::Unauthorized
            } else {
                AuthRejection::RedirectToLogin {
                    next: request_uri(parts)
                        .path_and_query()
                        .map_or_else(|| "/".to_string(), ToString::to_string),
                }
            }
        };

        // Get the session from extensions (set by SessionManagerLayer)
        let Some(session) = parts.extensions.get::<Session>() else {
            return Err(rejection());
        };

        let user: Option<CurrentUser> = session
            .get(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();

        user.map(Self).ok_or_else(rejection)
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is logged in.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Log a user in: rotate the session ID and store the identity.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Log the user out by discarding the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
mod tests {
    use axum::http::{Request, StatusCode};

    use super::*;

    fn parts(uri: &str, accept: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri(uri);
        if let Some(accept) = accept {
            builder = builder.header(header::ACCEPT, accept);
        }
        builder.body(()).map(|r| r.into_parts().0).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn test_wants_json() {
        assert!(wants_json(&parts("/cart/add", None)));
        assert!(wants_json(&parts("/api/autocomplete", None)));
        assert!(wants_json(&parts("/reviews", None)));
        assert!(wants_json(&parts("/checkout", Some("application/json"))));
        assert!(!wants_json(&parts("/cart", None)));
        assert!(!wants_json(&parts("/checkout", Some("text/html"))));
    }

    #[tokio::test]
    async fn test_missing_session_redirects_html() {
        let mut p = parts("/checkout?step=1", None);
        let Err(rejection) = RequireAuth::from_request_parts(&mut p, &()).await else {
            panic!("expected rejection");
        };
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
            Some("/users/login?next=%2Fcheckout%3Fstep%3D1")
        );
    }

    #[test]
    fn test_nested_route_uses_original_uri() {
        let mut p = parts("/add", None);
        p.extensions
            .insert(OriginalUri(Uri::from_static("/cart/add")));
        assert!(wants_json(&p));
        assert_eq!(request_uri(&p).path(), "/cart/add");
    }

    #[tokio::test]
    async fn test_missing_session_is_401_for_json() {
        let mut p = parts("/cart/count", None);
        let Err(rejection) = RequireAuth::from_request_parts(&mut p, &()).await else {
            panic!("expected rejection");
        };
        let response = rejection.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap_or_default();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap_or_default();
        assert_eq!(
            body,
            serde_json::json!({ "success": false, "message": "Authentication required." })
        );
    }

    #[tokio::test]
    async fn test_optional_auth_without_session() {
        let mut p = parts("/", None);
        let OptionalAuth(user) = OptionalAuth::from_request_parts(&mut p, &())
            .await
            .unwrap_or_else(|e| match e {});
        assert!(user.is_none());
    }
}
