//! Cluster access: reading deployment health and issuing restarts.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::Client;
use serde_json::json;
use tracing::{debug, info};

use crate::error::ClusterError;
use crate::types::HealthResult;

/// Annotation `kubectl rollout restart` sets on the pod template.
pub const RESTARTED_AT_ANNOTATION: &str = "kubectl.kubernetes.io/restartedAt";

/// The two cluster operations the monitor depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Report whether every pod of the deployment is ready.
    ///
    /// `Ok` carries a verdict (which may be unhealthy); `Err` means the
    /// health could not be determined.
    async fn get_health(&self, namespace: &str, deployment: &str)
        -> Result<HealthResult, ClusterError>;

    /// Trigger a rolling restart of the deployment.
    async fn restart_deployment(&self, namespace: &str, deployment: &str)
        -> Result<(), ClusterError>;
}

/// [`ClusterApi`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    label_selector: String,
}

impl KubeCluster {
    pub fn new(client: Client, label_selector: impl Into<String>) -> Self {
        Self {
            client,
            label_selector: label_selector.into(),
        }
    }

    /// Connect using the local kubeconfig, falling back to the in-cluster
    /// service account.
    pub async fn try_default(label_selector: impl Into<String>) -> Result<Self, kube::Error> {
        let client = Client::try_default().await?;
        Ok(Self::new(client, label_selector))
    }
}

#[async_trait]
impl ClusterApi for KubeCluster {
    async fn get_health(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<HealthResult, ClusterError> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        deployments
            .get_opt(deployment)
            .await
            .map_err(|e| ClusterError::from_kube(e, namespace, deployment))?
            .ok_or_else(|| ClusterError::NotFound {
                namespace: namespace.to_string(),
                name: deployment.to_string(),
            })?;

        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod_list = pods
            .list(&ListParams::default().labels(&self.label_selector))
            .await
            .map_err(|e| ClusterError::from_kube(e, namespace, deployment))?;

        debug!(
            namespace,
            selector = %self.label_selector,
            pods = pod_list.items.len(),
            "Listed controller pods"
        );

        Ok(assess_pods(&pod_list.items))
    }

    async fn restart_deployment(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<(), ClusterError> {
        let deployments: Api<Deployment> = Api::namespaced(self.client.clone(), namespace);

        let mut annotations = BTreeMap::new();
        annotations.insert(RESTARTED_AT_ANNOTATION, Utc::now().to_rfc3339());

        let patch = json!({
            "spec": {
                "template": {
                    "metadata": {
                        "annotations": annotations
                    }
                }
            }
        });

        deployments
            .patch(deployment, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| ClusterError::from_kube(e, namespace, deployment))?;

        info!(namespace, deployment, "Patched deployment restart annotation");
        Ok(())
    }
}

/// Healthy only when there is at least one pod and every container of
/// every pod is ready. Pods without container statuses are still starting
/// and count as not ready.
pub fn assess_pods(pods: &[Pod]) -> HealthResult {
    if pods.is_empty() {
        return HealthResult::unhealthy("no pods match the controller selector");
    }

    let not_ready: Vec<String> = pods
        .iter()
        .filter(|pod| !pod_ready(pod))
        .map(|pod| pod.metadata.name.clone().unwrap_or_default())
        .collect();

    if not_ready.is_empty() {
        HealthResult::healthy(format!("all {} pods ready", pods.len()))
    } else {
        HealthResult::unhealthy(format!(
            "{} of {} pods not ready: {}",
            not_ready.len(),
            pods.len(),
            not_ready.join(", ")
        ))
    }
}

fn pod_ready(pod: &Pod) -> bool {
    pod.status
        .as_ref()
        .and_then(|status| status.container_statuses.as_ref())
        .is_some_and(|statuses| !statuses.is_empty() && statuses.iter().all(|c| c.ready))
}
