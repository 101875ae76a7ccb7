//! Contact form route handlers.
//!
//! Messages land in `storefront.contact_messages` with status `new` for staff
//! to pick up.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use bricky_core::{ContactSubject, Email};

use super::PageContext;
use crate::db::ContactRepository;
use crate::error::Result;
use crate::filters;
use crate::forms::{FieldErrors, is_plausible_phone, non_blank};
use crate::models::NewContactMessage;
use crate::state::AppState;

const MAX_NAME_LENGTH: usize = 100;
const MAX_MESSAGE_LENGTH: usize = 5000;

/// Contact form data.
#[derive(Debug, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

/// Validate the contact form.
///
/// # Errors
///
/// Returns the problems found, keyed by form field.
pub fn validate_contact(form: &ContactForm) -> std::result::Result<NewContactMessage, FieldErrors> {
    let mut errors = FieldErrors::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.add("name", "Please enter your name.");
    } else if name.chars().count() > MAX_NAME_LENGTH {
        errors.add("name", format!("Name must be at most {MAX_NAME_LENGTH} characters."));
    }

    let email = if form.email.trim().is_empty() {
        errors.add("email", "Email can't be empty.");
        None
    } else {
        Email::parse(&form.email)
            .map_err(|_| errors.add("email", "Please enter a valid email address."))
            .ok()
    };

    let phone = non_blank(form.phone.as_deref());
    if phone.is_some_and(|p| !is_plausible_phone(p)) {
        errors.add("phone", "Please enter a valid phone number.");
    }

    let subject = form
        .subject
        .trim()
        .parse::<ContactSubject>()
        .map_err(|_| errors.add("subject", "Please choose a subject."))
        .ok();

    let message = form.message.trim();
    if message.is_empty() {
        errors.add("message", "Please enter a message.");
    } else if message.chars().count() > MAX_MESSAGE_LENGTH {
        errors.add(
            "message",
            format!("Message must be at most {MAX_MESSAGE_LENGTH} characters."),
        );
    }

    match (email, subject) {
        (Some(email), Some(subject)) if errors.is_empty() => Ok(NewContactMessage {
            name: name.to_owned(),
            email,
            phone: phone.map(str::to_owned),
            subject,
            message: message.to_owned(),
        }),
        _ => Err(errors),
    }
}

/// One `<option>` of the subject select.
pub struct SubjectOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

fn subject_options(selected: &str) -> Vec<SubjectOption> {
    ContactSubject::ALL
        .into_iter()
        .map(|s| SubjectOption {
            value: s.value(),
            label: s.label(),
            selected: s.value() == selected,
        })
        .collect()
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact/show.html")]
pub struct ContactTemplate {
    pub page: PageContext,
    pub form: ContactForm,
    pub subjects: Vec<SubjectOption>,
    pub errors: FieldErrors,
}

/// Thank-you page template.
#[derive(Template, WebTemplate)]
#[template(path = "contact/thanks.html")]
pub struct ContactThanksTemplate {
    pub page: PageContext,
    pub name: String,
}

/// Display the contact form, prefilled for logged-in users.
pub async fn show(page: PageContext) -> impl IntoResponse {
    let form = ContactForm {
        name: page
            .current_user
            .as_ref()
            .map(|u| u.username.clone())
            .unwrap_or_default(),
        email: page
            .current_user
            .as_ref()
            .map(|u| u.email.to_string())
            .unwrap_or_default(),
        ..ContactForm::default()
    };
    ContactTemplate {
        page,
        subjects: subject_options(ContactSubject::default().value()),
        form,
        errors: FieldErrors::new(),
    }
}

/// Store a contact message.
#[instrument(skip_all)]
pub async fn submit(
    State(state): State<AppState>,
    page: PageContext,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let message = match validate_contact(&form) {
        Ok(message) => message,
        Err(errors) => {
            let template = ContactTemplate {
                page,
                subjects: subject_options(form.subject.trim()),
                form,
                errors,
            };
            return Ok((StatusCode::BAD_REQUEST, template).into_response());
        }
    };

    let stored = ContactRepository::new(state.pool()).create(&message).await?;
    tracing::info!(message_id = %stored.id, subject = ?stored.subject, "Contact message received");

    Ok(ContactThanksTemplate {
        page,
        name: stored.name,
    }
    .into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(name: &str, email: &str, subject: &str, message: &str) -> ContactForm {
        ContactForm {
            name: name.to_string(),
            email: email.to_string(),
            phone: None,
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_valid_message() {
        let message =
            validate_contact(&form(" Ada ", "Ada@Bricky.Shop", "shipping", "Where is my order?")).unwrap();
        assert_eq!(message.name, "Ada");
        assert_eq!(message.email.as_str(), "ada@bricky.shop");
        assert_eq!(message.subject, ContactSubject::Shipping);
    }

    #[test]
    fn test_every_field_checked() {
        let errors = validate_contact(&form("", "nope", "weather", " ")).unwrap_err();
        assert_eq!(errors.first("name"), Some("Please enter your name."));
        assert_eq!(errors.first("email"), Some("Please enter a valid email address."));
        assert_eq!(errors.first("subject"), Some("Please choose a subject."));
        assert_eq!(errors.first("message"), Some("Please enter a message."));
    }

    #[test]
    fn test_subject_options_mark_selection() {
        let options = subject_options("returns");
        assert_eq!(options.len(), ContactSubject::ALL.len());
        assert_eq!(options.iter().filter(|o| o.selected).count(), 1);
        assert!(options.iter().any(|o| o.selected && o.value == "returns"));
    }
}
