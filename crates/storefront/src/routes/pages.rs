//! Static legal pages.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;

use super::PageContext;
use crate::filters;

#[derive(Template, WebTemplate)]
#[template(path = "pages/privacy_policy.html")]
pub struct PrivacyPolicyTemplate {
    pub page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/terms_of_service.html")]
pub struct TermsOfServiceTemplate {
    pub page: PageContext,
}

#[derive(Template, WebTemplate)]
#[template(path = "pages/cookie_settings.html")]
pub struct CookieSettingsTemplate {
    pub page: PageContext,
}

pub async fn privacy_policy(page: PageContext) -> impl IntoResponse {
    PrivacyPolicyTemplate { page }
}

pub async fn terms_of_service(page: PageContext) -> impl IntoResponse {
    TermsOfServiceTemplate { page }
}

pub async fn cookie_settings(page: PageContext) -> impl IntoResponse {
    CookieSettingsTemplate { page }
}
