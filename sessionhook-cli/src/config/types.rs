use std::time::Duration;

use serde::Deserialize;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfig {
    #[serde(default)]
    pub webhook: RawWebhookConfig,

    #[serde(default)]
    pub queue: RawQueueConfig,

    #[serde(default)]
    pub retry: RawRetryConfig,

    #[serde(default)]
    pub retention: RawRetentionConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWebhookConfig {
    /// Endpoint receiving completed sessions
    pub url: Option<String>,

    /// Per-request timeout
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawQueueConfig {
    /// Dispatch queue capacity, 0 for unbounded
    pub capacity: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRetryConfig {
    pub max_attempts: Option<u32>,

    #[serde(default, with = "humantime_serde")]
    pub base_delay: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub max_delay: Option<Duration>,

    pub jitter: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawRetentionConfig {
    #[serde(default, with = "humantime_serde")]
    pub sweep_interval: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub delivered_ttl: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub failed_ttl: Option<Duration>,

    #[serde(default, with = "humantime_serde")]
    pub idle_ttl: Option<Duration>,
}

/// Values given on the command line, applied over every config file
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub url: Option<String>,
    pub queue_capacity: Option<usize>,
}

impl From<&CliOverrides> for RawConfig {
    fn from(overrides: &CliOverrides) -> Self {
        RawConfig {
            webhook: RawWebhookConfig {
                url: overrides.url.clone(),
                timeout: None,
            },
            queue: RawQueueConfig {
                capacity: overrides.queue_capacity,
            },
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_leaves_everything_unset() {
        let raw: RawConfig = toml::from_str("").unwrap();
        assert!(raw.webhook.url.is_none());
        assert!(raw.webhook.timeout.is_none());
        assert!(raw.queue.capacity.is_none());
        assert!(raw.retry.max_attempts.is_none());
    }

    #[test]
    fn test_partial_toml_parses_durations() {
        let raw: RawConfig = toml::from_str(
            r#"
            [webhook]
            timeout = "2s"

            [retention]
            idle_ttl = "5m"
            "#,
        )
        .unwrap();
        assert_eq!(raw.webhook.timeout, Some(Duration::from_secs(2)));
        assert_eq!(raw.retention.idle_ttl, Some(Duration::from_secs(300)));
        assert!(raw.retention.failed_ttl.is_none());
    }

    #[test]
    fn test_overrides_become_raw_layer() {
        let overrides = CliOverrides {
            url: Some("http://localhost:9000/hook".to_string()),
            queue_capacity: Some(8),
        };
        let raw = RawConfig::from(&overrides);
        assert_eq!(raw.webhook.url.as_deref(), Some("http://localhost:9000/hook"));
        assert_eq!(raw.queue.capacity, Some(8));
        assert!(raw.retry.max_attempts.is_none());
    }
}
