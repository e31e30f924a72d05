//! Email notification channel over SMTP.

use std::fmt;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::error::ChannelError;
use crate::events::AlertEvent;
use crate::NotifyChannel;

/// Default SMTP host, matching a local relay.
pub const DEFAULT_SMTP_HOST: &str = "localhost";

/// Default SMTP port (plain SMTP).
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// SMTP delivery settings.
#[derive(Clone)]
pub struct EmailSettings {
    pub from: Mailbox,
    pub to: Vec<Mailbox>,
    pub smtp_host: String,
    pub smtp_port: u16,
    /// Username and password; enables STARTTLS when present
    pub credentials: Option<(String, String)>,
}

impl EmailSettings {
    /// Parse sender and comma-separated recipients.
    pub fn new(from: &str, to: &str) -> Result<Self, ChannelError> {
        let from = parse_mailbox("EMAIL_FROM", from)?;
        let to = to
            .split(',')
            .map(str::trim)
            .filter(|addr| !addr.is_empty())
            .map(|addr| parse_mailbox("EMAIL_TO", addr))
            .collect::<Result<Vec<_>, _>>()?;

        if to.is_empty() {
            return Err(ChannelError::InvalidSetting {
                key: "EMAIL_TO".to_string(),
                value: String::new(),
            });
        }

        Ok(Self {
            from,
            to,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            credentials: None,
        })
    }
}

impl fmt::Debug for EmailSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailSettings")
            .field("from", &self.from.to_string())
            .field("to", &self.to.len())
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field(
                "credentials",
                &self.credentials.as_ref().map(|(user, _)| user),
            )
            .finish()
    }
}

fn parse_mailbox(key: &str, value: &str) -> Result<Mailbox, ChannelError> {
    value.parse().map_err(|_| ChannelError::InvalidSetting {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Email notification channel.
pub struct EmailChannel {
    settings: Option<EmailSettings>,
}

impl EmailChannel {
    /// Create an email channel, disabled when no settings are given.
    #[must_use]
    pub fn from_config(settings: Option<EmailSettings>) -> Self {
        if settings.is_some() {
            debug!("Email notifications enabled");
        } else {
            debug!("Email notifications disabled (EMAIL_FROM/EMAIL_TO not set)");
        }

        Self { settings }
    }

    fn build_message(settings: &EmailSettings, event: &AlertEvent) -> Result<Message, ChannelError> {
        let mut builder = Message::builder()
            .from(settings.from.clone())
            .subject(format!("[{}] {}", event.severity().as_str(), event.title()))
            .header(ContentType::TEXT_PLAIN);

        for recipient in &settings.to {
            builder = builder.to(recipient.clone());
        }

        let mode = if event.dry_run { "dry run" } else { "live" };
        let body = format!(
            "{}\n\nNamespace:  {}\nDeployment: {}\nMode:       {}\nTime:       {}\n",
            event.message,
            event.namespace,
            event.deployment,
            mode,
            event.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        );

        Ok(builder.body(body)?)
    }

    fn transport(settings: &EmailSettings) -> Result<AsyncSmtpTransport<Tokio1Executor>, ChannelError> {
        let transport = match &settings.credentials {
            Some((username, password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)?
                    .port(settings.smtp_port)
                    .credentials(Credentials::new(username.clone(), password.clone()))
                    .build()
            }
            None => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.smtp_host)
                .port(settings.smtp_port)
                .build(),
        };

        Ok(transport)
    }
}

#[async_trait]
impl NotifyChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    fn enabled(&self) -> bool {
        self.settings.is_some()
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        let settings = self
            .settings
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured("EMAIL_FROM/EMAIL_TO".to_string()))?;

        let message = Self::build_message(settings, event)?;

        debug!(
            channel = "email",
            smtp_host = %settings.smtp_host,
            recipients = settings.to.len(),
            "Sending notification"
        );

        Self::transport(settings)?.send(message).await?;

        debug!(channel = "email", "Notification sent successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AlertKind;

    fn event() -> AlertEvent {
        AlertEvent::new(
            AlertKind::RemediationFailed,
            "ns",
            "web",
            "Failed to restart deployment: forbidden",
        )
    }

    #[test]
    fn test_settings_parse_recipient_list() {
        let settings =
            EmailSettings::new("healer@example.com", "ops@example.com, sre@example.com").unwrap();
        assert_eq!(settings.to.len(), 2);
        assert_eq!(settings.smtp_host, "localhost");
        assert_eq!(settings.smtp_port, 25);
    }

    #[test]
    fn test_settings_reject_bad_address() {
        let err = EmailSettings::new("not an address", "ops@example.com").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidSetting { ref key, .. } if key == "EMAIL_FROM"));

        let err = EmailSettings::new("healer@example.com", " , ").unwrap_err();
        assert!(matches!(err, ChannelError::InvalidSetting { ref key, .. } if key == "EMAIL_TO"));
    }

    #[test]
    fn test_debug_hides_password() {
        let mut settings = EmailSettings::new("healer@example.com", "ops@example.com").unwrap();
        settings.credentials = Some(("healer".to_string(), "hunter2".to_string()));
        let debug = format!("{settings:?}");
        assert!(debug.contains("healer"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_message_carries_title_and_body() {
        let settings = EmailSettings::new("healer@example.com", "ops@example.com").unwrap();
        let message = EmailChannel::build_message(&settings, &event()).unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: [Critical] Remediation Failed: ns/web"));
        assert!(raw.contains("Failed to restart deployment: forbidden"));
        assert!(raw.contains("Mode:       live"));
    }

    #[tokio::test]
    async fn test_send_fails_without_server() {
        let mut settings = EmailSettings::new("healer@example.com", "ops@example.com").unwrap();
        settings.smtp_host = "127.0.0.1".to_string();
        settings.smtp_port = 1;

        let channel = EmailChannel::from_config(Some(settings));
        let err = channel.send(&event()).await.unwrap_err();
        assert!(matches!(err, ChannelError::Smtp(_)));
    }

    #[tokio::test]
    async fn test_disabled_channel_refuses_send() {
        let channel = EmailChannel::from_config(None);
        assert!(!channel.enabled());
        assert!(matches!(
            channel.send(&event()).await,
            Err(ChannelError::NotConfigured(_))
        ));
    }
}
