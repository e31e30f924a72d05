//! Error types for configuration and cluster access.

use thiserror::Error;

/// Invalid startup configuration. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be at least 1")]
    Zero { key: &'static str },

    #[error(transparent)]
    Notify(#[from] notify::ChannelError),
}

/// Failures reported by the cluster capability.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The deployment does not exist in the namespace
    #[error("deployment {namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    /// The API server rejected the request
    #[error("API error {code}: {message}")]
    Api { code: u16, message: String },

    /// The API server could not be reached
    #[error("transport error: {0}")]
    Transport(String),
}

impl ClusterError {
    /// Classify a kube client error, treating 404 as a missing deployment.
    pub fn from_kube(err: kube::Error, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 404 => Self::NotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            kube::Error::Api(response) => Self::Api {
                code: response.code,
                message: response.message,
            },
            other => Self::Transport(other.to_string()),
        }
    }
}
