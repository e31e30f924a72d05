//! The periodic monitor loop.

use std::sync::Arc;

use chrono::Utc;
use notify::{AlertEvent, AlertKind, Notifier};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cluster::ClusterApi;
use crate::config::MonitorConfig;
use crate::probe::HealthProbe;
use crate::remediate::Remediator;
use crate::state::{FailureStateMachine, Transition};
use crate::types::{HealthResult, MonitorState, RemediationOutcome};

/// What happened during one tick.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub health: HealthResult,
    pub transition: Transition,
    pub remediation: Option<RemediationOutcome>,
    /// Alerts dispatched, in order
    pub alerts: Vec<AlertKind>,
}

/// Drives probe → state machine → remediation/alerts on a fixed interval.
///
/// Ticks run one at a time; a slow tick delays the next one instead of
/// overlapping it. The loop stops when its shutdown token is cancelled.
pub struct MonitorLoop {
    config: Arc<MonitorConfig>,
    probe: HealthProbe,
    machine: FailureStateMachine,
    remediator: Remediator,
    notifier: Notifier,
    shutdown: CancellationToken,
}

impl MonitorLoop {
    pub fn new(config: Arc<MonitorConfig>, cluster: Arc<dyn ClusterApi>, notifier: Notifier) -> Self {
        let probe = HealthProbe::new(
            Arc::clone(&cluster),
            config.namespace.clone(),
            config.deployment.clone(),
            config.probe_timeout,
        );
        let remediator = Remediator::new(
            cluster,
            config.namespace.clone(),
            config.deployment.clone(),
            config.restart_timeout,
        );

        Self {
            machine: FailureStateMachine::new(config.failure_limit),
            config,
            probe,
            remediator,
            notifier,
            shutdown: CancellationToken::new(),
        }
    }

    /// Token that stops [`MonitorLoop::run`] when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request the loop to stop after the current tick.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub fn state(&self) -> &MonitorState {
        self.machine.state()
    }

    /// Tick until stopped, returning the final state.
    pub async fn run(mut self) -> MonitorState {
        let shutdown = self.shutdown.clone();
        let mut ticker = tokio::time::interval(self.config.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            deployment = %self.config.target(),
            interval_secs = self.config.check_interval.as_secs(),
            failure_limit = self.config.failure_limit,
            dry_run = self.config.dry_run,
            channels = self.notifier.channel_count(),
            "Ingress health monitor started"
        );
        if !self.notifier.has_channels() {
            warn!("No notification channels active, alerts will only be logged");
        }

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        info!(
            deployment = %self.config.target(),
            consecutive_failures = self.machine.state().consecutive_failures,
            phase = %self.machine.state().phase,
            "Ingress health monitor stopped"
        );

        self.machine.state().clone()
    }

    /// Run a single probe and act on the resulting transition.
    pub async fn tick(&mut self) -> TickReport {
        let health = self.probe.check().await;
        let transition = self.machine.observe(&health);
        let target = self.config.target();

        let mut report = TickReport {
            health,
            transition,
            remediation: None,
            alerts: vec![],
        };

        match transition {
            Transition::Healthy => {
                info!(
                    deployment = %target,
                    detail = %report.health.detail,
                    "All ingress pods are healthy"
                );
            }

            Transition::Degrading {
                consecutive_failures,
            } => {
                warn!(
                    deployment = %target,
                    consecutive_failures,
                    failure_limit = self.machine.failure_limit(),
                    detail = %report.health.detail,
                    "Detected unhealthy ingress pods"
                );
            }

            Transition::StillFailing {
                consecutive_failures,
            } => {
                warn!(
                    deployment = %target,
                    consecutive_failures,
                    detail = %report.health.detail,
                    "Still unhealthy after remediation, waiting for recovery"
                );
            }

            Transition::ThresholdReached {
                consecutive_failures,
            } => {
                error!(
                    deployment = %target,
                    consecutive_failures,
                    detail = %report.health.detail,
                    "Failure limit reached, remediating"
                );

                let message = format!(
                    "{target} failed {consecutive_failures} consecutive health checks: {}",
                    report.health.detail
                );
                self.alert(&mut report, AlertKind::FailureThresholdReached, message)
                    .await;

                // Runs to completion even after shutdown; bounded by restart_timeout.
                let outcome = self.remediator.remediate(self.config.dry_run).await;
                self.machine.record_remediation(Utc::now());

                let (kind, message) = if !outcome.succeeded {
                    (
                        AlertKind::RemediationFailed,
                        format!("Failed to restart deployment {target}: {}", outcome.reason),
                    )
                } else if outcome.dry_run {
                    (
                        AlertKind::RemediationSucceeded,
                        format!("Would restart deployment {target} (dry run, no changes made)"),
                    )
                } else {
                    (
                        AlertKind::RemediationSucceeded,
                        format!("Remediation triggered: restarted deployment {target}"),
                    )
                };
                self.alert(&mut report, kind, message).await;

                report.remediation = Some(outcome);
            }

            Transition::Recovered { remediated_at } => {
                info!(deployment = %target, detail = %report.health.detail, "Ingress recovered");

                let message = match remediated_at {
                    Some(at) => format!(
                        "{target} is healthy again ({}), restart issued at {}",
                        report.health.detail,
                        at.format("%Y-%m-%d %H:%M:%S UTC")
                    ),
                    None => format!("{target} is healthy again ({})", report.health.detail),
                };
                self.alert(&mut report, AlertKind::Recovered, message).await;
            }
        }

        report
    }

    async fn alert(&self, report: &mut TickReport, kind: AlertKind, message: String) {
        let event = AlertEvent::new(
            kind,
            &self.config.namespace,
            &self.config.deployment,
            message,
        )
        .with_dry_run(self.config.dry_run);

        let results = self.notifier.dispatch(&event).await;
        let failed = results.iter().filter(|r| !r.is_delivered()).count();
        if failed > 0 {
            warn!(
                kind = ?kind,
                failed,
                delivered = results.len() - failed,
                "Alert not delivered to every channel"
            );
        }

        report.alerts.push(kind);
    }
}
