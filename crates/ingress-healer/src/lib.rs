//! Ingress controller health monitor with automatic restart.
//!
//! Checks the readiness of one deployment's pods on a fixed interval. After
//! `failure_limit` consecutive failed checks it restarts the deployment once
//! (or only logs the restart in dry-run mode) and alerts every configured
//! notification channel. A healthy check ends the episode and, if a restart
//! was issued, sends a recovery notice.
//!
//! - [`cluster`]: the `ClusterApi` capability and its Kubernetes implementation
//! - [`probe`]: turns cluster answers and failures into health verdicts
//! - [`state`]: consecutive-failure counting and escalation decisions
//! - [`remediate`]: the restart, gated by dry-run
//! - [`monitor`]: the periodic loop tying them together

pub mod cluster;
pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod remediate;
pub mod state;
pub mod types;

pub use cluster::{ClusterApi, KubeCluster};
pub use config::MonitorConfig;
pub use error::{ClusterError, ConfigError};
pub use monitor::{MonitorLoop, TickReport};
pub use probe::HealthProbe;
pub use remediate::Remediator;
pub use state::{FailureStateMachine, Transition};
pub use types::{HealthResult, MonitorState, Phase, RemediationOutcome};
