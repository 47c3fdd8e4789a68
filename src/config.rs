//! Configuration management for docgate.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::error::{GuardError, Result};
use crate::ratelimit::{Policy, RateLimiterConfig, TimeWindow};

/// Main configuration for the docgate client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GuardConfig {
    /// Admission limiter configuration
    #[serde(default)]
    pub limiter: LimiterSettings,

    /// Endpoint transport configuration
    #[serde(default)]
    pub transport: TransportSettings,
}

/// Limiter configuration as written in a config file.
///
/// The window is given either as a `unit` or as `window_ms`, not both.
/// Neither means one second.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimiterSettings {
    /// Maximum requests per window
    #[serde(default = "default_request_limit")]
    pub request_limit: u64,

    /// Window length as a time unit
    #[serde(default)]
    pub unit: Option<TimeWindow>,

    /// Window length in milliseconds
    #[serde(default)]
    pub window_ms: Option<u64>,

    /// Behaviour on a saturated window
    #[serde(default)]
    pub policy: Policy,

    /// Upper bound on a blocking wait in milliseconds; ten windows when unset
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            request_limit: default_request_limit(),
            unit: None,
            window_ms: None,
            policy: Policy::default(),
            max_wait_ms: None,
        }
    }
}

fn default_request_limit() -> u64 {
    5
}

impl LimiterSettings {
    /// Resolve the window length.
    pub fn window(&self) -> Result<Duration> {
        match (self.unit, self.window_ms) {
            (Some(_), Some(_)) => Err(GuardError::Config(
                "set either limiter.unit or limiter.window_ms, not both".to_string(),
            )),
            (Some(unit), None) => Ok(unit.duration()),
            (None, Some(ms)) => Ok(Duration::from_millis(ms)),
            (None, None) => Ok(TimeWindow::Second.duration()),
        }
    }

    /// Build a validated limiter configuration.
    pub fn to_limiter_config(&self) -> Result<RateLimiterConfig> {
        let mut config =
            RateLimiterConfig::new(self.request_limit, self.window()?).with_policy(self.policy);
        if let Some(ms) = self.max_wait_ms {
            config = config.with_max_wait(Duration::from_millis(ms));
        }
        config.validate()?;
        Ok(config)
    }
}

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportSettings {
    /// Document creation endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Bearer token sent with every request
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Honour HTTP_PROXY and friends from the environment
    #[serde(default = "default_use_system_proxy")]
    pub use_system_proxy: bool,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_ms: default_timeout_ms(),
            auth_token: None,
            use_system_proxy: default_use_system_proxy(),
        }
    }
}

fn default_endpoint() -> String {
    "https://ismp.crpt.ru/api/v3/lk/documents/create".to_string()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_use_system_proxy() -> bool {
    true
}

impl TransportSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl GuardConfig {
    /// Load configuration from a file path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GuardConfig = serde_yaml::from_str(yaml)
            .map_err(|e| GuardError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section without building anything.
    pub fn validate(&self) -> Result<()> {
        self.limiter.to_limiter_config()?;
        if self.transport.timeout_ms == 0 {
            return Err(GuardError::Config(
                "transport timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GuardConfig::default();

        assert_eq!(config.limiter.request_limit, 5);
        assert_eq!(config.limiter.window().unwrap(), Duration::from_secs(1));
        assert_eq!(config.limiter.policy, Policy::Blocking);
        assert_eq!(
            config.transport.endpoint,
            "https://ismp.crpt.ru/api/v3/lk/documents/create"
        );
        assert_eq!(config.transport.timeout(), Duration::from_secs(10));
        assert!(config.transport.use_system_proxy);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_yaml() {
        let yaml = r#"
limiter:
  request_limit: 20
  unit: minute
  policy: rejecting
  max_wait_ms: 1500
transport:
  endpoint: http://127.0.0.1:9000/documents
  timeout_ms: 2500
  auth_token: secret
"#;

        let config = GuardConfig::from_yaml(yaml).unwrap();
        let limiter = config.limiter.to_limiter_config().unwrap();

        assert_eq!(limiter.request_limit(), 20);
        assert_eq!(limiter.window(), Duration::from_secs(60));
        assert_eq!(limiter.policy(), Policy::Rejecting);
        assert_eq!(limiter.max_wait(), Duration::from_millis(1500));
        assert_eq!(config.transport.endpoint, "http://127.0.0.1:9000/documents");
        assert_eq!(config.transport.timeout_ms, 2500);
        assert_eq!(config.transport.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config = GuardConfig::from_yaml("limiter:\n  window_ms: 250\n").unwrap();

        assert_eq!(config.limiter.request_limit, 5);
        assert_eq!(config.limiter.window().unwrap(), Duration::from_millis(250));
        assert_eq!(config.transport.timeout_ms, 10_000);
    }

    #[test]
    fn test_unset_max_wait_defaults_to_ten_windows() {
        let config = GuardConfig::from_yaml("limiter:\n  window_ms: 250\n").unwrap();
        let limiter = config.limiter.to_limiter_config().unwrap();

        assert_eq!(limiter.max_wait(), Duration::from_millis(2500));
    }

    #[test]
    fn test_rejects_zero_limit() {
        let result = GuardConfig::from_yaml("limiter:\n  request_limit: 0\n");
        assert!(matches!(result, Err(GuardError::Config(_))));
    }

    #[test]
    fn test_rejects_ambiguous_window() {
        let yaml = "limiter:\n  unit: second\n  window_ms: 500\n";
        assert!(matches!(
            GuardConfig::from_yaml(yaml),
            Err(GuardError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_policy() {
        let result = GuardConfig::from_yaml("limiter:\n  policy: sometimes\n");
        assert!(matches!(result, Err(GuardError::Config(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = GuardConfig::from_file("/definitely/not/here/docgate.yaml");
        assert!(matches!(result, Err(GuardError::Io(_))));
    }
}
