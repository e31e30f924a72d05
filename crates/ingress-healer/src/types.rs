//! Values passed between the probe, the state machine and the remediator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Verdict of a single health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResult {
    pub healthy: bool,
    /// What was observed, or why the check failed
    pub detail: String,
    pub observed_at: DateTime<Utc>,
}

impl HealthResult {
    pub fn healthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: true,
            detail: detail.into(),
            observed_at: Utc::now(),
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: detail.into(),
            observed_at: Utc::now(),
        }
    }
}

/// Where the monitor is within an escalation episode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Last check passed
    #[default]
    Healthy,
    /// Failing, but below the failure limit
    Degrading,
    /// Failure limit reached; remediation issued for this episode
    Remediating,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degrading => write!(f, "degrading"),
            Self::Remediating => write!(f, "remediating"),
        }
    }
}

/// Failure-tracking state, owned by the state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorState {
    pub consecutive_failures: u32,
    pub phase: Phase,
    pub last_remediation_at: Option<DateTime<Utc>>,
}

/// Result of one remediation attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationOutcome {
    pub attempted: bool,
    pub succeeded: bool,
    pub dry_run: bool,
    pub reason: String,
}

impl RemediationOutcome {
    pub fn simulated() -> Self {
        Self {
            attempted: true,
            succeeded: true,
            dry_run: true,
            reason: "simulated".to_string(),
        }
    }

    pub fn restarted() -> Self {
        Self {
            attempted: true,
            succeeded: true,
            dry_run: false,
            reason: "restarted".to_string(),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            attempted: true,
            succeeded: false,
            dry_run: false,
            reason: reason.into(),
        }
    }
}
