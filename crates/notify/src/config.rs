//! Channel settings read from the environment.

use std::time::Duration;

use tracing::warn;

use crate::channels::email::{EmailSettings, DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};
use crate::error::ChannelError;

/// Environment variable to disable all notifications.
pub const ENV_NOTIFY_DISABLED: &str = "NOTIFY_DISABLED";

/// Default bound on a single channel send.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings for every notification channel.
///
/// A channel whose settings are absent is disabled; absence is never an error.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub disabled: bool,
    pub slack_webhook_url: Option<String>,
    pub pagerduty_routing_key: Option<String>,
    pub pagerduty_events_url: Option<String>,
    pub email: Option<EmailSettings>,
    pub send_timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            slack_webhook_url: None,
            pagerduty_routing_key: None,
            pagerduty_events_url: None,
            email: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

impl NotifyConfig {
    /// Read channel settings from the process environment.
    pub fn from_env() -> Result<Self, ChannelError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read channel settings through `lookup`, which maps a variable name to
    /// its value. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ChannelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let disabled = get(ENV_NOTIFY_DISABLED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        let send_timeout = match get("NOTIFY_TIMEOUT_SECS") {
            Some(raw) => match parse_number("NOTIFY_TIMEOUT_SECS", &raw)? {
                0 => {
                    return Err(ChannelError::InvalidSetting {
                        key: "NOTIFY_TIMEOUT_SECS".to_string(),
                        value: raw,
                    })
                }
                secs => Duration::from_secs(secs),
            },
            None => DEFAULT_SEND_TIMEOUT,
        };

        let email = match (get("EMAIL_FROM"), get("EMAIL_TO")) {
            (Some(from), Some(to)) => {
                let mut settings = EmailSettings::new(&from, &to)?;
                settings.smtp_host =
                    get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string());
                settings.smtp_port = match get("SMTP_PORT") {
                    Some(raw) => parse_number("SMTP_PORT", &raw)?,
                    None => DEFAULT_SMTP_PORT,
                };
                settings.credentials = get("SMTP_USERNAME").zip(get("SMTP_PASSWORD"));
                Some(settings)
            }
            (None, None) => None,
            _ => {
                warn!("Email config incomplete (need EMAIL_FROM and EMAIL_TO), email disabled");
                None
            }
        };

        Ok(Self {
            disabled,
            slack_webhook_url: get("SLACK_HOOK_URL").or_else(|| get("SLACK_WEBHOOK_URL")),
            pagerduty_routing_key: get("PAGERDUTY_ROUTING_KEY"),
            pagerduty_events_url: get("PAGERDUTY_EVENTS_URL"),
            email,
            send_timeout,
        })
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ChannelError> {
    raw.trim().parse().map_err(|_| ChannelError::InvalidSetting {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_empty_environment_disables_every_channel() {
        let config = NotifyConfig::from_lookup(lookup(&[])).unwrap();
        assert!(!config.disabled);
        assert!(config.slack_webhook_url.is_none());
        assert!(config.pagerduty_routing_key.is_none());
        assert!(config.email.is_none());
        assert_eq!(config.send_timeout, DEFAULT_SEND_TIMEOUT);
    }

    #[test]
    fn test_reads_channel_settings() {
        let config = NotifyConfig::from_lookup(lookup(&[
            ("SLACK_HOOK_URL", "https://hooks.slack.com/services/T/B/X"),
            ("PAGERDUTY_ROUTING_KEY", "R0UT1NG"),
            ("EMAIL_FROM", "healer@example.com"),
            ("EMAIL_TO", "ops@example.com"),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "587"),
            ("SMTP_USERNAME", "healer"),
            ("SMTP_PASSWORD", "secret"),
            ("NOTIFY_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();

        assert_eq!(
            config.slack_webhook_url.as_deref(),
            Some("https://hooks.slack.com/services/T/B/X")
        );
        assert_eq!(config.pagerduty_routing_key.as_deref(), Some("R0UT1NG"));
        let email = config.email.unwrap();
        assert_eq!(email.smtp_host, "smtp.example.com");
        assert_eq!(email.smtp_port, 587);
        assert!(email.credentials.is_some());
        assert_eq!(config.send_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_slack_webhook_alias() {
        let config =
            NotifyConfig::from_lookup(lookup(&[("SLACK_WEBHOOK_URL", "https://example.com/x")]))
                .unwrap();
        assert_eq!(
            config.slack_webhook_url.as_deref(),
            Some("https://example.com/x")
        );
    }

    #[test]
    fn test_partial_email_config_disables_email() {
        let config =
            NotifyConfig::from_lookup(lookup(&[("EMAIL_FROM", "healer@example.com")])).unwrap();
        assert!(config.email.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let err = NotifyConfig::from_lookup(lookup(&[
            ("EMAIL_FROM", "healer@example.com"),
            ("EMAIL_TO", "ops@example.com"),
            ("SMTP_PORT", "smtp"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ChannelError::InvalidSetting { ref key, .. } if key == "SMTP_PORT"));
    }

    #[test]
    fn test_zero_send_timeout_is_an_error() {
        let err = NotifyConfig::from_lookup(lookup(&[("NOTIFY_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(
            matches!(err, ChannelError::InvalidSetting { ref key, .. } if key == "NOTIFY_TIMEOUT_SECS")
        );
    }

    #[test]
    fn test_notify_disabled_flag() {
        let config = NotifyConfig::from_lookup(lookup(&[("NOTIFY_DISABLED", "TRUE")])).unwrap();
        assert!(config.disabled);
    }
}
