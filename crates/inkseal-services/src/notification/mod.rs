//! Outbound notifications to share recipients.
//!
//! Delivery is best effort: the lifecycle dispatches after a transition has committed and
//! only logs failures.

mod email;

pub use email::EmailNotifier;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkseal_core::Config;
use std::sync::{Arc, Mutex};

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    Message(String),

    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Ask the recipient to review and sign.
    SignRequest {
        to: String,
        document_name: String,
        sign_link: String,
        expires_at: DateTime<Utc>,
    },
    /// Tell the recipient their signature was applied.
    SignedCopy {
        to: String,
        document_name: String,
        download_link: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Notification::SignRequest { to, .. } | Notification::SignedCopy { to, .. } => to,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            Notification::SignRequest { document_name, .. } => {
                format!("Signature requested: {}", document_name)
            }
            Notification::SignedCopy { document_name, .. } => {
                format!("Signed copy: {}", document_name)
            }
        }
    }

    pub fn body(&self) -> String {
        match self {
            Notification::SignRequest {
                document_name,
                sign_link,
                expires_at,
                ..
            } => format!(
                "You have been asked to sign \"{}\".\n\n\
                 Review and sign the document here:\n{}\n\n\
                 This link expires in 7 days ({}).\n",
                document_name,
                sign_link,
                expires_at.format("%Y-%m-%d %H:%M UTC")
            ),
            Notification::SignedCopy {
                document_name,
                download_link,
                ..
            } => format!(
                "Thank you for signing \"{}\".\n\n\
                 The signed copy is available here while your link is valid:\n{}\n",
                document_name, download_link
            ),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Notification::SignRequest { .. } => "sign_request",
            Notification::SignedCopy { .. } => "signed_copy",
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log instead of sending them. Used when email is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            kind = notification.kind(),
            to = %notification.recipient(),
            subject = %notification.subject(),
            "Email disabled, notification not sent"
        );
        Ok(())
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(notification.clone());
        Ok(())
    }
}

/// SMTP when `EMAIL_ENABLED` and SMTP are configured, the log otherwise.
pub fn create_notifier(config: &Config) -> Arc<dyn Notifier> {
    match EmailNotifier::from_config(config) {
        Some(email) => Arc::new(email),
        None => Arc::new(LogNotifier),
    }
}
