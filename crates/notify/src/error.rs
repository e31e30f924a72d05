//! Error types for the notification system.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when configuring channels or sending notifications.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// A channel setting could not be parsed
    #[error("Invalid value for {key}: {value:?}")]
    InvalidSetting { key: String, value: String },

    /// Rate limited by the service
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Email could not be built or delivered
    #[error("SMTP delivery failed: {0}")]
    Smtp(String),

    /// The channel did not answer within the dispatch timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<lettre::transport::smtp::Error> for ChannelError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}

impl From<lettre::error::Error> for ChannelError {
    fn from(err: lettre::error::Error) -> Self {
        Self::Smtp(err.to_string())
    }
}
