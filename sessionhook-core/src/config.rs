//! Configuration for webhook delivery
//!
//! Everything except the endpoint URL has a default, so the smallest
//! valid config file is:
//!
//! ```toml
//! [webhook]
//! url = "https://collector.example.com/sessions"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Complete sessionhook configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionhookConfig {
    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Where and how completed sessions are POSTed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Endpoint receiving completed session payloads (required)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Url>,

    /// Upper bound on a single POST, connect included
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

/// Capacity of the dispatch signal queue
///
/// `capacity = 0` selects an unbounded queue: `ingest` never waits for the
/// delivery worker. Any other value bounds the queue, and `ingest` waits
/// once that many notifications are pending, so producer throughput is
/// limited by how fast the worker drains them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub capacity: usize,
}

/// Delivery attempts per completed session
///
/// The default of one attempt means failed deliveries are reported and
/// never retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Randomize each delay within `[delay / 2, delay]`
    #[serde(default = "default_true")]
    pub jitter: bool,
}

/// How long records stay in the store once they stop changing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub sweep_interval: Duration,

    /// Successfully delivered records
    #[serde(default = "default_delivered_ttl", with = "humantime_serde")]
    pub delivered_ttl: Duration,

    /// Records whose final delivery attempt failed
    #[serde(default = "default_failed_ttl", with = "humantime_serde")]
    pub failed_ttl: Duration,

    /// Records that never received a completion flag
    #[serde(default = "default_idle_ttl", with = "humantime_serde")]
    pub idle_ttl: Duration,
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_true() -> bool {
    true
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_delivered_ttl() -> Duration {
    Duration::from_secs(60)
}

fn default_failed_ttl() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_idle_ttl() -> Duration {
    Duration::from_secs(30 * 60)
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: default_timeout(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
            jitter: default_true(),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            sweep_interval: default_sweep_interval(),
            delivered_ttl: default_delivered_ttl(),
            failed_ttl: default_failed_ttl(),
            idle_ttl: default_idle_ttl(),
        }
    }
}

impl WebhookConfig {
    /// Parse and check an endpoint URL
    pub fn parse_url(raw: &str) -> Result<Url, ConfigError> {
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        check_scheme(&url)?;
        Ok(url)
    }
}

fn check_scheme(url: &Url) -> Result<(), ConfigError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ConfigError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

impl SessionhookConfig {
    /// Config pointing at `url` with every other setting defaulted
    pub fn for_endpoint(url: Url) -> Self {
        Self {
            webhook: WebhookConfig {
                url: Some(url),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Parse a TOML document
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a TOML file
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// The configured endpoint, or an error if none was set
    pub fn endpoint(&self) -> Result<&Url, ConfigError> {
        self.webhook.url.as_ref().ok_or(ConfigError::MissingUrl)
    }

    /// Check the settings a running client depends on
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_scheme(self.endpoint()?)?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        if self.webhook.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.retention.sweep_interval.is_zero() {
            return Err(ConfigError::ZeroSweepInterval);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionhookConfig::default();
        assert!(config.webhook.url.is_none());
        assert_eq!(config.webhook.timeout, Duration::from_secs(30));
        assert_eq!(config.queue.capacity, 0);
        assert_eq!(config.retry.max_attempts, 1);
        assert!(config.retry.jitter);
        assert_eq!(config.retention.delivered_ttl, Duration::from_secs(60));
    }

    #[test]
    fn test_minimal_toml() {
        let toml = r#"
            [webhook]
            url = "https://collector.example.com/sessions"
        "#;
        let config = SessionhookConfig::from_toml_str(toml).unwrap();
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "https://collector.example.com/sessions"
        );
        assert_eq!(config.retry, RetryConfig::default());
        config.validate().unwrap();
    }

    #[test]
    fn test_full_toml_with_humantime_durations() {
        let toml = r#"
            [webhook]
            url = "http://127.0.0.1:9000/hook"
            timeout = "5s"

            [queue]
            capacity = 64

            [retry]
            max_attempts = 4
            base_delay = "250ms"
            max_delay = "10s"
            jitter = false

            [retention]
            sweep_interval = "1s"
            delivered_ttl = "2m"
            failed_ttl = "1h"
            idle_ttl = "90s"
        "#;
        let config = SessionhookConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.webhook.timeout, Duration::from_secs(5));
        assert_eq!(config.queue.capacity, 64);
        assert_eq!(config.retry.max_attempts, 4);
        assert_eq!(config.retry.base_delay, Duration::from_millis(250));
        assert!(!config.retry.jitter);
        assert_eq!(config.retention.delivered_ttl, Duration::from_secs(120));
        assert_eq!(config.retention.failed_ttl, Duration::from_secs(3600));
        assert_eq!(config.retention.idle_ttl, Duration::from_secs(90));
    }

    #[test]
    fn test_validate_requires_url() {
        let config = SessionhookConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingUrl)));
    }

    #[test]
    fn test_validate_rejects_non_http_scheme() {
        let url = Url::parse("ftp://example.com/upload").unwrap();
        let config = SessionhookConfig::for_endpoint(url);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let url = Url::parse("https://example.com/hook").unwrap();
        let mut config = SessionhookConfig::for_endpoint(url);
        config.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroAttempts)));
    }

    #[test]
    fn test_validate_rejects_zero_sweep_interval() {
        let toml = r#"
            [webhook]
            url = "https://example.com/hook"

            [retention]
            sweep_interval = "0s"
        "#;
        let config = SessionhookConfig::from_toml_str(toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroSweepInterval)
        ));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let toml = r#"
            [webhook]
            url = "https://example.com/hook"
            timeout = "0s"
        "#;
        let config = SessionhookConfig::from_toml_str(toml).unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn test_parse_url() {
        assert!(WebhookConfig::parse_url("https://example.com/a").is_ok());
        assert!(WebhookConfig::parse_url("not a url").is_err());
        assert!(WebhookConfig::parse_url("file:///etc/passwd").is_err());
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[webhook]\nurl = \"https://example.com/h\"\n").unwrap();

        let config = SessionhookConfig::load_from_path(&path).unwrap();
        assert!(config.webhook.url.is_some());
    }

    #[test]
    fn test_toml_roundtrip_keeps_durations_readable() {
        let url = Url::parse("https://example.com/hook").unwrap();
        let config = SessionhookConfig::for_endpoint(url);
        let text = toml::to_string_pretty(&config).unwrap();
        assert!(text.contains("timeout = \"30s\""));
        let parsed = SessionhookConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
