//! Consecutive-failure tracking and escalation decisions.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{HealthResult, MonitorState, Phase};

/// What a single probe result did to the monitor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Healthy, and no remediation was pending
    Healthy,
    /// First healthy probe after a remediation attempt
    Recovered {
        remediated_at: Option<DateTime<Utc>>,
    },
    /// Unhealthy, still below the failure limit
    Degrading { consecutive_failures: u32 },
    /// The failure limit was just reached; remediate once
    ThresholdReached { consecutive_failures: u32 },
    /// Unhealthy beyond the limit; remediation already issued this episode
    StillFailing { consecutive_failures: u32 },
}

impl Transition {
    /// Whether this transition should trigger a remediation.
    pub const fn triggers_remediation(&self) -> bool {
        matches!(self, Self::ThresholdReached { .. })
    }
}

/// Counts consecutive failed probes and decides when to escalate.
///
/// Remediation is requested exactly once per escalation episode, at the
/// probe that brings the count to the failure limit. Only a healthy probe
/// ends the episode.
#[derive(Debug)]
pub struct FailureStateMachine {
    failure_limit: u32,
    state: MonitorState,
}

impl FailureStateMachine {
    /// A limit of zero is treated as one.
    pub fn new(failure_limit: u32) -> Self {
        Self {
            failure_limit: failure_limit.max(1),
            state: MonitorState::default(),
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub const fn failure_limit(&self) -> u32 {
        self.failure_limit
    }

    /// Feed one probe result.
    pub fn observe(&mut self, result: &HealthResult) -> Transition {
        let transition = if result.healthy {
            self.observe_healthy()
        } else {
            self.observe_unhealthy()
        };

        debug!(
            ?transition,
            consecutive_failures = self.state.consecutive_failures,
            phase = %self.state.phase,
            "State updated"
        );

        transition
    }

    /// Record when the remediation for the current episode ran.
    pub fn record_remediation(&mut self, at: DateTime<Utc>) {
        self.state.last_remediation_at = Some(at);
    }

    fn observe_healthy(&mut self) -> Transition {
        let previous = std::mem::take(&mut self.state);

        if previous.phase == Phase::Remediating {
            Transition::Recovered {
                remediated_at: previous.last_remediation_at,
            }
        } else {
            Transition::Healthy
        }
    }

    fn observe_unhealthy(&mut self) -> Transition {
        let failures = self.state.consecutive_failures.saturating_add(1);
        self.state.consecutive_failures = failures;

        if failures < self.failure_limit {
            self.state.phase = Phase::Degrading;
            Transition::Degrading {
                consecutive_failures: failures,
            }
        } else if self.state.phase == Phase::Remediating {
            Transition::StillFailing {
                consecutive_failures: failures,
            }
        } else {
            self.state.phase = Phase::Remediating;
            Transition::ThresholdReached {
                consecutive_failures: failures,
            }
        }
    }
}
