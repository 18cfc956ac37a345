use super::types::{
    CliOverrides, RawConfig, RawQueueConfig, RawRetentionConfig, RawRetryConfig,
    RawWebhookConfig,
};
use anyhow::{Context, Result};
use sessionhook_core::{
    QueueConfig, RetentionConfig, RetryConfig, SessionhookConfig, WebhookConfig,
};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<SessionhookConfig> {
        Self::load_with_overrides(&CliOverrides::default())
    }

    /// Load merged configuration with command-line values on top
    pub fn load_with_overrides(overrides: &CliOverrides) -> Result<SessionhookConfig> {
        Self::load_layers(
            &Self::user_config_path(),
            &Self::project_config_path(),
            overrides,
        )
    }

    /// Get user config path (`$XDG_CONFIG_HOME/sessionhook/config.toml`)
    pub fn user_config_path() -> PathBuf {
        sessionhook_paths::user_config_file()
    }

    /// Get project config path
    /// Can be overridden with SESSIONHOOK_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("SESSIONHOOK_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".sessionhook/config.toml")
        }
    }

    /// Layer user file, project file and overrides, later layers winning
    fn load_layers(
        user_path: &Path,
        project_path: &Path,
        overrides: &CliOverrides,
    ) -> Result<SessionhookConfig> {
        let mut raw = RawConfig::default();

        // Layer 1: User config
        if let Some(user_config) = Self::read_raw(user_path)? {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(project_path)? {
            raw = Self::merge_raw(raw, project_config);
        }

        // Layer 3: Command line
        raw = Self::merge_raw(raw, RawConfig::from(overrides));

        Self::finalize(raw)
    }

    fn read_raw(path: &Path) -> Result<Option<RawConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawConfig, overlay: RawConfig) -> RawConfig {
        RawConfig {
            webhook: RawWebhookConfig {
                url: overlay.webhook.url.or(base.webhook.url),
                timeout: overlay.webhook.timeout.or(base.webhook.timeout),
            },
            queue: RawQueueConfig {
                capacity: overlay.queue.capacity.or(base.queue.capacity),
            },
            retry: RawRetryConfig {
                max_attempts: overlay.retry.max_attempts.or(base.retry.max_attempts),
                base_delay: overlay.retry.base_delay.or(base.retry.base_delay),
                max_delay: overlay.retry.max_delay.or(base.retry.max_delay),
                jitter: overlay.retry.jitter.or(base.retry.jitter),
            },
            retention: RawRetentionConfig {
                sweep_interval: overlay
                    .retention
                    .sweep_interval
                    .or(base.retention.sweep_interval),
                delivered_ttl: overlay
                    .retention
                    .delivered_ttl
                    .or(base.retention.delivered_ttl),
                failed_ttl: overlay.retention.failed_ttl.or(base.retention.failed_ttl),
                idle_ttl: overlay.retention.idle_ttl.or(base.retention.idle_ttl),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawConfig) -> Result<SessionhookConfig> {
        let webhook_defaults = WebhookConfig::default();
        let retry_defaults = RetryConfig::default();
        let retention_defaults = RetentionConfig::default();

        let url = raw
            .webhook
            .url
            .as_deref()
            .map(WebhookConfig::parse_url)
            .transpose()?;

        Ok(SessionhookConfig {
            webhook: WebhookConfig {
                url,
                timeout: raw.webhook.timeout.unwrap_or(webhook_defaults.timeout),
            },
            queue: QueueConfig {
                capacity: raw.queue.capacity.unwrap_or_default(),
            },
            retry: RetryConfig {
                max_attempts: raw.retry.max_attempts.unwrap_or(retry_defaults.max_attempts),
                base_delay: raw.retry.base_delay.unwrap_or(retry_defaults.base_delay),
                max_delay: raw.retry.max_delay.unwrap_or(retry_defaults.max_delay),
                jitter: raw.retry.jitter.unwrap_or(retry_defaults.jitter),
            },
            retention: RetentionConfig {
                sweep_interval: raw
                    .retention
                    .sweep_interval
                    .unwrap_or(retention_defaults.sweep_interval),
                delivered_ttl: raw
                    .retention
                    .delivered_ttl
                    .unwrap_or(retention_defaults.delivered_ttl),
                failed_ttl: raw
                    .retention
                    .failed_ttl
                    .unwrap_or(retention_defaults.failed_ttl),
                idle_ttl: raw.retention.idle_ttl.unwrap_or(retention_defaults.idle_ttl),
            },
        })
    }
}
