//! Contact form messages.

use chrono::{DateTime, Utc};
use serde::Serialize;

use bricky_core::{ContactMessageId, ContactStatus, ContactSubject, Email};

/// A stored contact message.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContactMessage {
    pub id: ContactMessageId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: ContactSubject,
    pub message: String,
    pub status: ContactStatus,
    pub reply: Option<String>,
    pub replied_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated contact form input.
#[derive(Debug, Clone)]
pub struct NewContactMessage {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub subject: ContactSubject,
    pub message: String,
}
