//! Alert fan-out for the ingress healer.
//!
//! This crate delivers health and remediation alerts to Slack, PagerDuty and
//! email. Every configured channel receives every alert; a channel that fails
//! or hangs never keeps the others from delivering.
//!
//! # Usage
//!
//! ```no_run
//! use notify::{AlertEvent, AlertKind, Notifier, NotifyConfig};
//!
//! # async fn run() -> Result<(), notify::ChannelError> {
//! let notifier = Notifier::from_config(&NotifyConfig::from_env()?);
//!
//! let results = notifier
//!     .dispatch(&AlertEvent::new(
//!         AlertKind::FailureThresholdReached,
//!         "ingress-nginx",
//!         "ingress-nginx-controller",
//!         "3 consecutive failed health checks",
//!     ))
//!     .await;
//!
//! for result in &results {
//!     println!("{}: delivered={}", result.channel, result.is_delivered());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! - `SLACK_HOOK_URL`: Slack incoming webhook (enables Slack)
//! - `PAGERDUTY_ROUTING_KEY`: Events API v2 routing key (enables PagerDuty)
//! - `EMAIL_FROM` / `EMAIL_TO`: sender and recipients (enable email)
//! - `SMTP_HOST`, `SMTP_PORT`, `SMTP_USERNAME`, `SMTP_PASSWORD`: SMTP server
//! - `NOTIFY_TIMEOUT_SECS`: bound on a single channel send
//! - `NOTIFY_DISABLED`: Set to "true" to disable all notifications
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`SlackChannel`], [`PagerDutyChannel`] and [`EmailChannel`] implement it
//! - [`Notifier`] dispatches alerts to all enabled channels concurrently

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod config;
pub mod error;
pub mod events;

pub use channels::email::{EmailChannel, EmailSettings};
pub use channels::pagerduty::PagerDutyChannel;
pub use channels::slack::SlackChannel;
pub use channels::NotifyChannel;
pub use config::NotifyConfig;
pub use error::ChannelError;
pub use events::{AlertEvent, AlertKind, Severity};

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

/// Outcome of delivering one alert to one channel.
#[derive(Debug)]
pub struct SinkResult {
    pub channel: &'static str,
    pub result: Result<(), ChannelError>,
}

impl SinkResult {
    #[must_use]
    pub const fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Central notification dispatcher.
///
/// The `Notifier` owns the set of enabled channels and fans each alert out
/// to all of them at once, bounding every send by `send_timeout`.
pub struct Notifier {
    channels: Vec<Arc<dyn NotifyChannel>>,
    disabled: bool,
    send_timeout: Duration,
}

impl Notifier {
    /// Create a notifier with every channel whose settings are present.
    #[must_use]
    pub fn from_config(config: &NotifyConfig) -> Self {
        if config.disabled {
            info!("Notifications disabled via NOTIFY_DISABLED");
            return Self::disabled();
        }

        let candidates: Vec<Arc<dyn NotifyChannel>> = vec![
            Arc::new(SlackChannel::from_config(config.slack_webhook_url.clone())),
            Arc::new(PagerDutyChannel::from_config(
                config.pagerduty_routing_key.clone(),
                config.pagerduty_events_url.clone(),
            )),
            Arc::new(EmailChannel::from_config(config.email.clone())),
        ];

        let channels: Vec<_> = candidates
            .into_iter()
            .filter(|channel| {
                if channel.enabled() {
                    info!(channel = channel.name(), "Notification channel enabled");
                } else {
                    warn!(
                        channel = channel.name(),
                        "Notification channel not configured, skipping"
                    );
                }
                channel.enabled()
            })
            .collect();

        if channels.is_empty() {
            warn!("No notification channels configured");
        } else {
            info!(
                channel_count = channels.len(),
                "Notification system initialized"
            );
        }

        Self {
            channels,
            disabled: false,
            send_timeout: config.send_timeout,
        }
    }

    /// Create a notifier with specific channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Arc<dyn NotifyChannel>>) -> Self {
        Self {
            channels,
            disabled: false,
            send_timeout: config::DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Override the per-channel send timeout.
    #[must_use]
    pub fn with_send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    /// Create a disabled notifier (for testing or when notifications are off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channels: vec![],
            disabled: true,
            send_timeout: config::DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Check if any notification channels are enabled.
    #[must_use]
    pub fn has_channels(&self) -> bool {
        !self.disabled && !self.channels.is_empty()
    }

    /// Get the number of enabled channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        if self.disabled {
            0
        } else {
            self.channels.len()
        }
    }

    /// Send an alert to every enabled channel and wait for all of them.
    ///
    /// Channels are sent to concurrently, once each. Failures and timeouts
    /// are logged and reported in the returned results; they never abort
    /// delivery to the remaining channels.
    pub async fn dispatch(&self, event: &AlertEvent) -> Vec<SinkResult> {
        if self.disabled {
            debug!("Notifications disabled, skipping event");
            return vec![];
        }

        info!(kind = ?event.kind, message = %event.message, "Alert: {}", event.title());

        let sends = self
            .channels
            .iter()
            .filter(|channel| channel.enabled())
            .map(|channel| self.send_one(channel.as_ref(), event));

        join_all(sends).await
    }

    async fn send_one(&self, channel: &dyn NotifyChannel, event: &AlertEvent) -> SinkResult {
        let name = channel.name();

        let result = match tokio::time::timeout(self.send_timeout, channel.send(event)).await {
            Ok(result) => result,
            Err(_) => Err(ChannelError::Timeout(self.send_timeout)),
        };

        match &result {
            Ok(()) => debug!(channel = name, "Notification sent"),
            Err(e) => error!(channel = name, error = %e, "Failed to send notification"),
        }

        SinkResult {
            channel: name,
            result,
        }
    }
}
