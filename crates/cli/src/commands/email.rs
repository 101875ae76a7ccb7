//! Email backend check.

use tracing::info;

use bricky_storefront::config::StorefrontConfig;
use bricky_storefront::services::EmailService;

use super::CliError;

/// Report which backend is configured and whether the SMTP relay answers.
///
/// With `to`, also sends a verification-style test message.
///
/// # Errors
///
/// Returns an error if configuration is missing or the relay rejects us.
pub async fn check(to: Option<&str>) -> Result<(), CliError> {
    let config = StorefrontConfig::from_env()?;
    let email =
        EmailService::new(&config.email).map_err(|e| CliError::EmailSetup(e.to_string()))?;

    info!(backend = email.backend_name(), "Email backend configured");
    match &config.email.smtp {
        Some(smtp) => info!("SMTP relay {}:{} from {}", smtp.host, smtp.port, email.from_address()),
        None => info!("No SMTP_HOST set; emails are logged to the console"),
    }

    if email.test_connection().await? {
        info!("Email backend OK");
    } else {
        return Err(CliError::EmailSetup("SMTP relay did not accept the connection".to_string()));
    }

    if let Some(to) = to {
        let link = format!("{}/users/resend-verification", config.base_url);
        email.send_verification_email(to, "test", &link).await?;
        info!("Test message sent to {to}");
    }
    Ok(())
}
