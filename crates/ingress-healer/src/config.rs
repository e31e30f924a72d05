//! Monitor configuration, read once at startup.

use std::time::Duration;

use notify::NotifyConfig;

use crate::error::ConfigError;

pub const DEFAULT_NAMESPACE: &str = "ingress-nginx";
pub const DEFAULT_DEPLOYMENT: &str = "ingress-nginx-controller";
pub const DEFAULT_LABEL_SELECTOR: &str = "app.kubernetes.io/component=controller";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_FAILURE_LIMIT: u32 = 3;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_RESTART_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 30;

/// Everything the monitor needs to know about its target and its channels.
///
/// Built once by [`MonitorConfig::from_env`] and shared read-only.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub namespace: String,
    pub deployment: String,
    /// Selects the deployment's pods
    pub label_selector: String,
    pub check_interval: Duration,
    /// Consecutive failed checks that trigger a restart
    pub failure_limit: u32,
    pub dry_run: bool,
    pub probe_timeout: Duration,
    pub restart_timeout: Duration,
    pub shutdown_grace: Duration,
    pub notify: NotifyConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            deployment: DEFAULT_DEPLOYMENT.to_string(),
            label_selector: DEFAULT_LABEL_SELECTOR.to_string(),
            check_interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            failure_limit: DEFAULT_FAILURE_LIMIT,
            dry_run: false,
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            restart_timeout: Duration::from_secs(DEFAULT_RESTART_TIMEOUT_SECS),
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            notify: NotifyConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Read configuration from the process environment.
    pub fn from_env(dry_run: bool) -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok(), dry_run)
    }

    /// Read configuration through `lookup` and validate it.
    ///
    /// # Environment Variables
    /// - `NGINX_NAMESPACE` (default: ingress-nginx)
    /// - `NGINX_DEPLOYMENT` (default: ingress-nginx-controller)
    /// - `LABEL_SELECTOR` (default: app.kubernetes.io/component=controller)
    /// - `CHECK_INTERVAL` seconds (default: 60)
    /// - `FAILURE_LIMIT` (default: 3)
    /// - `PROBE_TIMEOUT_SECS`, `RESTART_TIMEOUT_SECS`, `SHUTDOWN_GRACE_SECS`
    /// - channel settings, see [`NotifyConfig::from_lookup`]
    pub fn from_lookup<F>(lookup: F, dry_run: bool) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let config = Self {
            namespace: get("NGINX_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            deployment: get("NGINX_DEPLOYMENT").unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            label_selector: get("LABEL_SELECTOR")
                .unwrap_or_else(|| DEFAULT_LABEL_SELECTOR.to_string()),
            check_interval: seconds(&get, "CHECK_INTERVAL", DEFAULT_CHECK_INTERVAL_SECS)?,
            failure_limit: number(&get, "FAILURE_LIMIT", DEFAULT_FAILURE_LIMIT)?,
            dry_run,
            probe_timeout: seconds(&get, "PROBE_TIMEOUT_SECS", DEFAULT_PROBE_TIMEOUT_SECS)?,
            restart_timeout: seconds(&get, "RESTART_TIMEOUT_SECS", DEFAULT_RESTART_TIMEOUT_SECS)?,
            shutdown_grace: seconds(&get, "SHUTDOWN_GRACE_SECS", DEFAULT_SHUTDOWN_GRACE_SECS)?,
            notify: NotifyConfig::from_lookup(&lookup)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the monitor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.namespace.is_empty() {
            return Err(ConfigError::Empty {
                key: "NGINX_NAMESPACE",
            });
        }
        if self.deployment.is_empty() {
            return Err(ConfigError::Empty {
                key: "NGINX_DEPLOYMENT",
            });
        }
        if self.label_selector.is_empty() {
            return Err(ConfigError::Empty {
                key: "LABEL_SELECTOR",
            });
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::Zero {
                key: "CHECK_INTERVAL",
            });
        }
        if self.failure_limit == 0 {
            return Err(ConfigError::Zero {
                key: "FAILURE_LIMIT",
            });
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::Zero {
                key: "PROBE_TIMEOUT_SECS",
            });
        }
        if self.restart_timeout.is_zero() {
            return Err(ConfigError::Zero {
                key: "RESTART_TIMEOUT_SECS",
            });
        }
        Ok(())
    }

    /// `namespace/deployment`, for logs and messages.
    pub fn target(&self) -> String {
        format!("{}/{}", self.namespace, self.deployment)
    }
}

fn number<G, T>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

fn seconds<G>(get: &G, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    number(get, key, default).map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::from_lookup(lookup(&[]), false).unwrap();
        assert_eq!(config.namespace, "ingress-nginx");
        assert_eq!(config.deployment, "ingress-nginx-controller");
        assert_eq!(config.check_interval, Duration::from_secs(60));
        assert_eq!(config.failure_limit, 3);
        assert!(!config.dry_run);
        assert_eq!(config.target(), "ingress-nginx/ingress-nginx-controller");
    }

    #[test]
    fn test_overrides() {
        let config = MonitorConfig::from_lookup(
            lookup(&[
                ("NGINX_NAMESPACE", "edge"),
                ("NGINX_DEPLOYMENT", "edge-proxy"),
                ("CHECK_INTERVAL", "15"),
                ("FAILURE_LIMIT", " 5 "),
                ("SLACK_HOOK_URL", "https://hooks.example.com/x"),
            ]),
            true,
        )
        .unwrap();

        assert_eq!(config.target(), "edge/edge-proxy");
        assert_eq!(config.check_interval, Duration::from_secs(15));
        assert_eq!(config.failure_limit, 5);
        assert!(config.dry_run);
        assert!(config.notify.slack_webhook_url.is_some());
    }

    #[test]
    fn test_rejects_unparsable_number() {
        let err = MonitorConfig::from_lookup(lookup(&[("CHECK_INTERVAL", "1m")]), false)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "CHECK_INTERVAL",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let err =
            MonitorConfig::from_lookup(lookup(&[("FAILURE_LIMIT", "0")]), false).unwrap_err();
        assert!(matches!(err, ConfigError::Zero { key: "FAILURE_LIMIT" }));
    }

    #[test]
    fn test_rejects_zero_notify_timeout() {
        let err = MonitorConfig::from_lookup(lookup(&[("NOTIFY_TIMEOUT_SECS", "0")]), false)
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Notify(notify::ChannelError::InvalidSetting { ref key, .. })
                if key == "NOTIFY_TIMEOUT_SECS"
        ));
    }

    #[test]
    fn test_rejects_empty_target() {
        let err =
            MonitorConfig::from_lookup(lookup(&[("NGINX_DEPLOYMENT", "  ")]), false).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Empty {
                key: "NGINX_DEPLOYMENT"
            }
        ));
    }

    #[test]
    fn test_invalid_channel_setting_is_fatal() {
        let err = MonitorConfig::from_lookup(
            lookup(&[("EMAIL_FROM", "nope"), ("EMAIL_TO", "ops@example.com")]),
            false,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Notify(_)));
    }
}
