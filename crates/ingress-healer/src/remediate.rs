//! Restart remediation with dry-run gating.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::cluster::ClusterApi;
use crate::types::RemediationOutcome;

/// Restarts the monitored deployment.
///
/// Makes at most one restart call per invocation and never retries; the
/// next attempt only happens on the next escalation episode.
pub struct Remediator {
    cluster: Arc<dyn ClusterApi>,
    namespace: String,
    deployment: String,
    timeout: Duration,
}

impl Remediator {
    pub fn new(
        cluster: Arc<dyn ClusterApi>,
        namespace: impl Into<String>,
        deployment: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            cluster,
            namespace: namespace.into(),
            deployment: deployment.into(),
            timeout,
        }
    }

    pub async fn remediate(&self, dry_run: bool) -> RemediationOutcome {
        info!(
            namespace = %self.namespace,
            deployment = %self.deployment,
            dry_run,
            "[Self-Heal] Restarting deployment"
        );

        if dry_run {
            info!("[Dry Run] Skipping actual restart");
            return RemediationOutcome::simulated();
        }

        let restart = self
            .cluster
            .restart_deployment(&self.namespace, &self.deployment);

        let outcome = match tokio::time::timeout(self.timeout, restart).await {
            Ok(Ok(())) => RemediationOutcome::restarted(),
            Ok(Err(e)) => RemediationOutcome::failed(e.to_string()),
            Err(_) => RemediationOutcome::failed(format!(
                "restart timed out after {}s",
                self.timeout.as_secs()
            )),
        };

        if outcome.succeeded {
            info!(
                namespace = %self.namespace,
                deployment = %self.deployment,
                "Restart issued"
            );
        } else {
            error!(
                namespace = %self.namespace,
                deployment = %self.deployment,
                reason = %outcome.reason,
                "Failed to restart"
            );
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterApi;
    use crate::error::ClusterError;

    fn remediator(mock: MockClusterApi) -> Remediator {
        Remediator::new(
            Arc::new(mock),
            "ingress-nginx",
            "ingress-nginx-controller",
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_dry_run_never_touches_cluster() {
        let mut mock = MockClusterApi::new();
        mock.expect_restart_deployment().never();

        let outcome = remediator(mock).remediate(true).await;
        assert_eq!(
            outcome,
            RemediationOutcome {
                attempted: true,
                succeeded: true,
                dry_run: true,
                reason: "simulated".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_live_restart_succeeds() {
        let mut mock = MockClusterApi::new();
        mock.expect_restart_deployment()
            .times(1)
            .returning(|_, _| Ok(()));

        let outcome = remediator(mock).remediate(false).await;
        assert!(outcome.attempted);
        assert!(outcome.succeeded);
        assert!(!outcome.dry_run);
    }

    #[tokio::test]
    async fn test_live_restart_failure_is_reported() {
        let mut mock = MockClusterApi::new();
        mock.expect_restart_deployment().times(1).returning(|_, _| {
            Err(ClusterError::Api {
                code: 403,
                message: "deployments.apps is forbidden".to_string(),
            })
        });

        let outcome = remediator(mock).remediate(false).await;
        assert!(outcome.attempted);
        assert!(!outcome.succeeded);
        assert!(!outcome.dry_run);
        assert_eq!(outcome.reason, "API error 403: deployments.apps is forbidden");
    }

    struct HungRestart;

    #[async_trait::async_trait]
    impl ClusterApi for HungRestart {
        async fn get_health(
            &self,
            _: &str,
            _: &str,
        ) -> Result<crate::types::HealthResult, ClusterError> {
            Ok(crate::types::HealthResult::healthy("ok"))
        }

        async fn restart_deployment(&self, _: &str, _: &str) -> Result<(), ClusterError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_timeout_is_a_failure() {
        let remediator = Remediator::new(Arc::new(HungRestart), "ns", "web", Duration::from_secs(30));

        let outcome = remediator.remediate(false).await;
        assert!(!outcome.succeeded);
        assert_eq!(outcome.reason, "restart timed out after 30s");
    }
}
