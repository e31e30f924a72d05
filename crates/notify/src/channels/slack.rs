//! Slack webhook notification channel.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ChannelError;
use crate::events::AlertEvent;
use crate::NotifyChannel;

/// Slack webhook notification channel.
pub struct SlackChannel {
    webhook_url: Option<String>,
    client: reqwest::Client,
}

impl SlackChannel {
    /// Create a Slack channel, disabled when no webhook URL is given.
    #[must_use]
    pub fn from_config(webhook_url: Option<String>) -> Self {
        if webhook_url.is_some() {
            debug!("Slack notifications enabled");
        } else {
            debug!("Slack notifications disabled (SLACK_HOOK_URL not set)");
        }

        Self {
            webhook_url,
            client: reqwest::Client::new(),
        }
    }

    /// Create a Slack channel with a specific webhook URL.
    #[must_use]
    pub fn new(webhook_url: String) -> Self {
        Self::from_config(Some(webhook_url))
    }

    /// Format an event as a Slack webhook payload.
    fn format_payload(event: &AlertEvent) -> SlackPayload {
        let mode = if event.dry_run { "Dry Run" } else { "Live" };

        let fields = vec![
            SlackField {
                title: "Namespace".to_string(),
                value: event.namespace.clone(),
                short: true,
            },
            SlackField {
                title: "Deployment".to_string(),
                value: event.deployment.clone(),
                short: true,
            },
            SlackField {
                title: "Mode".to_string(),
                value: mode.to_string(),
                short: true,
            },
        ];

        let attachment = SlackAttachment {
            fallback: format!("{}: {}", event.title(), event.message),
            color: event.severity().color().to_string(),
            author_name: Some("Ingress Healer".to_string()),
            title: event.title(),
            text: event.message.clone(),
            fields,
            footer: Some(format!(
                "{} | {}",
                event.severity().as_str(),
                event.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            )),
            ts: Some(event.timestamp.timestamp()),
        };

        SlackPayload {
            text: event.title(),
            attachments: vec![attachment],
        }
    }
}

#[async_trait]
impl NotifyChannel for SlackChannel {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    async fn send(&self, event: &AlertEvent) -> Result<(), ChannelError> {
        let webhook_url = self
            .webhook_url
            .as_ref()
            .ok_or_else(|| ChannelError::NotConfigured("SLACK_HOOK_URL".to_string()))?;

        let payload = Self::format_payload(event);

        debug!(channel = "slack", kind = ?event.kind, "Sending notification");

        let response = self.client.post(webhook_url).json(&payload).send().await?;

        if response.status().is_success() {
            debug!(channel = "slack", "Notification sent successfully");
            return Ok(());
        }

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            return Err(ChannelError::RateLimited { retry_after_secs });
        }

        let body = response.text().await.unwrap_or_default();

        warn!(
            channel = "slack",
            status = %status,
            body = %body,
            "Slack webhook request failed"
        );

        Err(ChannelError::Other(format!(
            "Slack returned {status}: {body}"
        )))
    }
}

// =============================================================================
// Slack API types
// =============================================================================

#[derive(Debug, Serialize)]
struct SlackPayload {
    text: String,
    attachments: Vec<SlackAttachment>,
}

#[derive(Debug, Serialize)]
struct SlackAttachment {
    fallback: String,
    color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    author_name: Option<String>,
    title: String,
    text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<SlackField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ts: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SlackField {
    title: String,
    value: String,
    short: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AlertKind;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn threshold_event() -> AlertEvent {
        AlertEvent::new(
            AlertKind::FailureThresholdReached,
            "ingress-nginx",
            "ingress-nginx-controller",
            "3 consecutive failed health checks",
        )
    }

    #[test]
    fn test_disabled_without_url() {
        let channel = SlackChannel::from_config(None);
        assert!(!channel.enabled());
    }

    #[test]
    fn test_payload_uses_severity_color() {
        let payload = SlackChannel::format_payload(&threshold_event());
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["attachments"][0]["color"], "#e74c3c");
        assert_eq!(
            json["attachments"][0]["text"],
            "3 consecutive failed health checks"
        );
        assert_eq!(json["attachments"][0]["fields"][2]["value"], "Live");
    }

    #[tokio::test]
    async fn test_send_posts_to_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "text": "Ingress Unhealthy: ingress-nginx/ingress-nginx-controller"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = SlackChannel::new(format!("{}/hook", server.uri()));
        channel.send(&threshold_event()).await.unwrap();
    }

    #[tokio::test]
    async fn test_send_reports_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
            .mount(&server)
            .await;

        let channel = SlackChannel::new(server.uri());
        let err = channel.send(&threshold_event()).await.unwrap_err();
        assert!(matches!(
            err,
            ChannelError::RateLimited {
                retry_after_secs: 30
            }
        ));
    }

    #[tokio::test]
    async fn test_send_reports_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("invalid_token"))
            .mount(&server)
            .await;

        let channel = SlackChannel::new(server.uri());
        let err = channel.send(&threshold_event()).await.unwrap_err();
        assert!(err.to_string().contains("invalid_token"));
    }
}
