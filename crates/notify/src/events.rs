//! Alert event types raised by the ingress healer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels for alerts and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - normal operations
    Info,
    /// Warning - something needs attention
    Warning,
    /// Critical - immediate action required
    Critical,
}

impl Severity {
    /// Get the attachment color for this severity.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        match self {
            Self::Info => "#3498db",     // Blue
            Self::Warning => "#f39c12",  // Orange
            Self::Critical => "#e74c3c", // Red
        }
    }

    /// Get display name for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "Info",
            Self::Warning => "Warning",
            Self::Critical => "Critical",
        }
    }

    /// Severity value understood by the PagerDuty Events API.
    #[must_use]
    pub const fn pagerduty(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

/// What happened to the monitored deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Consecutive failed health checks reached the failure limit
    FailureThresholdReached,
    /// The restart was issued (or simulated in dry-run mode)
    RemediationSucceeded,
    /// The restart call failed
    RemediationFailed,
    /// The deployment passed a health check after remediation
    Recovered,
}

impl AlertKind {
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::FailureThresholdReached | Self::RemediationFailed => Severity::Critical,
            Self::RemediationSucceeded => Severity::Warning,
            Self::Recovered => Severity::Info,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailureThresholdReached => "Ingress Unhealthy",
            Self::RemediationSucceeded => "Remediation Triggered",
            Self::RemediationFailed => "Remediation Failed",
            Self::Recovered => "Ingress Recovered",
        }
    }

    /// Whether this event closes an incident rather than opening one.
    #[must_use]
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::Recovered)
    }
}

/// A single alert fanned out to every configured channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub kind: AlertKind,
    pub message: String,
    pub namespace: String,
    pub deployment: String,
    /// Raised while running in dry-run mode
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl AlertEvent {
    /// Create an alert for the given deployment, timestamped now.
    pub fn new(
        kind: AlertKind,
        namespace: impl Into<String>,
        deployment: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            namespace: namespace.into(),
            deployment: deployment.into(),
            dry_run: false,
            timestamp: Utc::now(),
        }
    }

    /// Mark the alert as raised in dry-run mode.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Get a short title for this event.
    #[must_use]
    pub fn title(&self) -> String {
        let prefix = if self.dry_run { "[Dry Run] " } else { "" };
        format!(
            "{prefix}{}: {}/{}",
            self.kind.as_str(),
            self.namespace,
            self.deployment
        )
    }

    #[must_use]
    pub const fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Stable key shared by every alert about the same deployment, so a
    /// recovery can resolve the incident opened by the failure.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        format!("{}/{}", self.namespace, self.deployment)
    }
}
