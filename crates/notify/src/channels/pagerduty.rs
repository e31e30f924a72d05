//! PagerDuty Events API v2 notification channel.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::events::AlertEvent;
use crate::NotifyChannel;

/// Public Events API v2 endpoint.
pub const DEFAULT_EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";

/// Value reported as the `source` of every incident.
const EVENT_SOURCE: &str = "ingress-healer";

/// PagerDuty notification channel.
pub struct PagerDutyChannel {
    routing_key: Option<String>,
    events_url: String,
    client: reqwest::Client,
}

impl PagerDutyChannel {
    /// Create a PagerDuty channel, disabled when no routing key is given.
    #[must_use]
    pub fn from_config(routing_key: Option<String>, events_url: Option<String>) -> Self {
        if routing_key.is_some() {
            debug!("PagerDuty notifications enabled");
        } else {
            debug!("PagerDuty notifications disabled (PAGERDUTY_ROUTING_KEY not set)");
        }

        Self {
            routing_key,
            events_url: events_url.unwrap_or_else(|| DEFAULT_EVENTS_URL.to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// Create a PagerDuty channel posting to the public Events API.
    #[must_use]
    pub fn new(routing_key: String) -> Self {
        Self::from_config(Some(routing_key), None)
    }

    /// Recoveries resolve the incident opened for the same deployment;
    /// everything else triggers.
    fn format_payload<'a>(routing_key: &'a str, event: &'a AlertEvent) -> EventPayload<'a> {
        if event.kind.is_resolution() {
            return EventPayload {
                routing_key,
                event_action: "resolve",
                dedup_key: event.dedup_key(),
                payload: None,
            };
        }

        EventPayload {
            routing_key,
            event_action: "trigger",
            dedup_key: event.dedup_key(),
            payload: Some(EventDetails {
                summary: format!("{}: {}", event.title(), event.message),
                severity: event.severity().pagerduty(),
                source: EVENT_SOURCE,
                component: &event.deployment,
                group: &event.namespace,
                timestamp: event.timestamp.to_rfc3339(),
            }),
        }
    }
}

#[async_trait]
impl NotifyChannel for PagerDutyChannel {
    fn name(&self) -> &'static str {
        "pagerduty"
    }

    fn enabled(&self) -> bool {
        self.routing_key.is_some()
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        let routing_key = self
            .routing_key
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("PAGERDUTY_ROUTING_KEY".to_string()))?;

        let payload = Self::format_payload(routing_key, event);

        debug!(
            channel = "pagerduty",
            action = payload.event_action,
            kind = ?event.kind,
            "Sending notification"
        );

        let response = self
            .client
            .post(&self.events_url)
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            debug!(channel = "pagerduty", "Notification sent successfully");
            return Ok(());
        }

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ChannelError::RateLimited {
                retry_after_secs: 60,
            });
        }

        let body = response.text().await.unwrap_or_default();

        warn!(
            channel = "pagerduty",
            status = %status,
            body = %body,
            "PagerDuty enqueue request failed"
        );

        Err(ChannelError::Other(format!(
            "PagerDuty returned {status}: {body}"
        )))
    }
}

// =============================================================================
// PagerDuty API types
// =============================================================================

#[derive(Debug, Serialize)]
struct EventPayload<'a> {
    routing_key: &'a str,
    event_action: &'static str,
    dedup_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<EventDetails<'a>>,
}

#[derive(Debug, Serialize)]
struct EventDetails<'a> {
    summary: String,
    severity: &'static str,
    source: &'static str,
    component: &'a str,
    group: &'a str,
    timestamp: String,
}
