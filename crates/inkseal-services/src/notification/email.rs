//! SMTP delivery.

use async_trait::async_trait;
use inkseal_core::Config;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::sync::Arc;

use super::{Notification, Notifier, NotifyError};

#[derive(Clone)]
pub struct EmailNotifier {
    mailer: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl EmailNotifier {
    /// Returns `None` if email is disabled or SMTP is not configured.
    pub fn from_config(config: &Config) -> Option<Self> {
        if !config.email_enabled() {
            tracing::debug!("Email notifications disabled (EMAIL_ENABLED=false)");
            return None;
        }
        let host = config.smtp_host()?;
        let from: Mailbox = match config.smtp_from()?.parse() {
            Ok(mailbox) => mailbox,
            Err(e) => {
                tracing::error!(error = %e, "Invalid SMTP_FROM, email notifications disabled");
                return None;
            }
        };
        let port = config.smtp_port().unwrap_or(587);

        let builder = if config.smtp_tls() {
            match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host) {
                Ok(b) => b,
                Err(e) => {
                    tracing::error!(error = %e, host = %host, "Failed to configure SMTP relay");
                    return None;
                }
            }
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
        };
        let builder = builder.port(port);
        let builder = match (config.smtp_user(), config.smtp_password()) {
            (Some(u), Some(p)) => builder.credentials(Credentials::new(u.to_string(), p.to_string())),
            _ => builder,
        };

        tracing::info!(
            host = %host,
            port = port,
            tls = config.smtp_tls(),
            "Email notifier initialized"
        );

        Some(Self {
            mailer: Arc::new(builder.build()),
            from,
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let to: Mailbox = notification
            .recipient()
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(notification.recipient().to_string()))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(notification.body())
            .map_err(|e| NotifyError::Message(e.to_string()))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Delivery(e.to_string()))?;
        tracing::info!(to = %notification.recipient(), "Notification email sent");
        Ok(())
    }
}
