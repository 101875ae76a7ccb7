//! Outbound email.
//!
//! Uses SMTP via lettre with Askama templates. Without `SMTP_HOST` the service
//! falls back to a console backend that writes messages to the log, which is
//! what local development uses.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;
use crate::models::{Order, OrderElement};

#[derive(Template)]
#[template(path = "email/verification.html")]
struct VerificationEmailHtml<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/verification.txt")]
struct VerificationEmailText<'a> {
    username: &'a str,
    link: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    username: &'a str,
    order: &'a Order,
    elements: &'a [OrderElement],
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    username: &'a str,
    order: &'a Order,
    elements: &'a [OrderElement],
    order_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

#[derive(Clone)]
enum Backend {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    Console,
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    backend: Backend,
    from_address: String,
}

impl std::fmt::Debug for EmailService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailService")
            .field("backend", &self.backend_name())
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let backend = match &config.smtp {
            Some(smtp) => {
                let mut builder =
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)?.port(smtp.port);
                if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
                    builder = builder.credentials(Credentials::new(
                        username.clone(),
                        password.expose_secret().to_string(),
                    ));
                }
                Backend::Smtp(builder.build())
            }
            None => Backend::Console,
        };

        Ok(Self {
            backend,
            from_address: config.from.clone(),
        })
    }

    /// A service that only logs messages.
    #[must_use]
    pub fn console(from_address: impl Into<String>) -> Self {
        Self {
            backend: Backend::Console,
            from_address: from_address.into(),
        }
    }

    /// `"smtp"` or `"console"`.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Smtp(_) => "smtp",
            Backend::Console => "console",
        }
    }

    /// The configured sender address.
    #[must_use]
    pub fn from_address(&self) -> &str {
        &self.from_address
    }

    /// Probe the SMTP relay. The console backend always reports ready.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be reached.
    pub async fn test_connection(&self) -> Result<bool, EmailError> {
        match &self.backend {
            Backend::Smtp(mailer) => Ok(mailer.test_connection().await?),
            Backend::Console => Ok(true),
        }
    }

    /// Send the account verification link.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_verification_email(
        &self,
        to: &str,
        username: &str,
        link: &str,
    ) -> Result<(), EmailError> {
        let html = VerificationEmailHtml { username, link }.render()?;
        let text = VerificationEmailText { username, link }.render()?;

        self.send_multipart_email(to, "Verify your Bricky account", &text, &html)
            .await
    }

    /// Send an order confirmation with the placed order's lines and totals.
    ///
    /// # Errors
    ///
    /// Returns error if email fails to send or template fails to render.
    pub async fn send_order_confirmation(
        &self,
        to: &str,
        username: &str,
        order: &Order,
        elements: &[OrderElement],
        order_url: &str,
    ) -> Result<(), EmailError> {
        let html = OrderConfirmationHtml {
            username,
            order,
            elements,
            order_url,
        }
        .render()?;
        let text = OrderConfirmationText {
            username,
            order,
            elements,
            order_url,
        }
        .render()?;

        let subject = format!("Your Bricky order #{}", order.id);
        self.send_multipart_email(to, &subject, &text, &html).await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        match &self.backend {
            Backend::Smtp(mailer) => {
                mailer.send(email).await?;
                tracing::info!(to = %to, subject = %subject, "Email sent successfully");
            }
            Backend::Console => {
                tracing::info!(
                    to = %to,
                    subject = %subject,
                    body = %text_body,
                    "Email (console backend)"
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_console_backend_without_smtp() {
        let service = EmailService::new(&EmailConfig::console()).unwrap();
        assert_eq!(service.backend_name(), "console");
    }

    #[test]
    fn test_verification_text_contains_link() {
        let text = VerificationEmailText {
            username: "brickfan",
            link: "https://bricky.shop/users/verify-email/abc/1-2",
        }
        .render()
        .unwrap();
        assert!(text.contains("brickfan"));
        assert!(text.contains("https://bricky.shop/users/verify-email/abc/1-2"));
    }

    #[tokio::test]
    async fn test_console_send_succeeds() {
        let service = EmailService::console("Bricky <noreply@bricky.shop>");
        service
            .send_verification_email("fan@bricky.shop", "brickfan", "https://bricky.shop/x")
            .await
            .unwrap();
        assert!(service.test_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_invalid_recipient() {
        let service = EmailService::console("noreply@bricky.shop");
        let err = service
            .send_verification_email("not an address", "brickfan", "https://bricky.shop/x")
            .await
            .unwrap_err();
        assert!(matches!(err, EmailError::InvalidAddress(_)));
    }
}
