//! Health probe for the monitored deployment.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cluster::ClusterApi;
use crate::types::HealthResult;

/// Checks the deployment through the cluster capability.
///
/// Every expected failure (missing deployment, API error, unreachable API
/// server, timeout) comes back as an unhealthy [`HealthResult`].
pub struct HealthProbe {
    cluster: Arc<dyn ClusterApi>,
    namespace: String,
    deployment: String,
    timeout: Duration,
}

impl HealthProbe {
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

    pub async fn check(&self) -> HealthResult {
        let health = self.cluster.get_health(&self.namespace, &self.deployment);

        match tokio::time::timeout(self.timeout, health).await {
            Ok(Ok(result)) => {
                debug!(healthy = result.healthy, detail = %result.detail, "Probe completed");
                result
            }
            Ok(Err(e)) => {
                warn!(
                    namespace = %self.namespace,
                    deployment = %self.deployment,
                    error = %e,
                    "Health check failed"
                );
                HealthResult::unhealthy(e.to_string())
            }
            Err(_) => {
                warn!(
                    namespace = %self.namespace,
                    deployment = %self.deployment,
                    timeout_secs = self.timeout.as_secs(),
                    "Health check timed out"
                );
                HealthResult::unhealthy(format!(
                    "health check timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::MockClusterApi;
    use crate::error::ClusterError;

    fn probe(mock: MockClusterApi) -> HealthProbe {
        HealthProbe::new(
            Arc::new(mock),
            "ingress-nginx",
            "ingress-nginx-controller",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_passes_through_verdict() {
        let mut mock = MockClusterApi::new();
        mock.expect_get_health()
            .times(1)
            .returning(|_, _| Ok(HealthResult::healthy("all 2 pods ready")));

        let result = probe(mock).check().await;
        assert!(result.healthy);
        assert_eq!(result.detail, "all 2 pods ready");
    }

    #[tokio::test]
    async fn test_not_found_maps_to_unhealthy() {
        let mut mock = MockClusterApi::new();
        mock.expect_get_health().returning(|ns, name| {
            Err(ClusterError::NotFound {
                namespace: ns.to_string(),
                name: name.to_string(),
            })
        });

        let result = probe(mock).check().await;
        assert!(!result.healthy);
        assert_eq!(
            result.detail,
            "deployment ingress-nginx/ingress-nginx-controller not found"
        );
    }

    #[tokio::test]
    async fn test_transport_error_maps_to_unhealthy() {
        let mut mock = MockClusterApi::new();
        mock.expect_get_health()
            .returning(|_, _| Err(ClusterError::Transport("connection refused".to_string())));

        let result = probe(mock).check().await;
        assert!(!result.healthy);
        assert!(result.detail.starts_with("transport error"));
    }

    struct StalledCluster;

    #[async_trait::async_trait]
    impl ClusterApi for StalledCluster {
        async fn get_health(&self, _: &str, _: &str) -> Result<HealthResult, ClusterError> {
            std::future::pending().await
        }

        async fn restart_deployment(&self, _: &str, _: &str) -> Result<(), ClusterError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_maps_to_unhealthy() {
        let probe = HealthProbe::new(Arc::new(StalledCluster), "ns", "web", Duration::from_secs(5));

        let result = probe.check().await;
        assert!(!result.healthy);
        assert_eq!(result.detail, "health check timed out after 5s");
    }
}
