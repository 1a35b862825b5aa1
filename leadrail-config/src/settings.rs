//! Pipeline settings: per-queue-family policy and bus configuration.

use crate::error::{ConfigError, Result};
use crate::redis::RedisSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Backoff strategy kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Fixed,
    Exponential,
}

/// Retry backoff settings for one queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffSettings {
    pub kind: BackoffKind,
    pub delay_ms: u64,
}

impl BackoffSettings {
    pub fn fixed(delay_ms: u64) -> Self {
        Self {
            kind: BackoffKind::Fixed,
            delay_ms,
        }
    }

    pub fn exponential(delay_ms: u64) -> Self {
        Self {
            kind: BackoffKind::Exponential,
            delay_ms,
        }
    }
}

/// Delivery and execution policy for one queue family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    /// Attempts before a job is parked in the dead set.
    pub attempts: u32,
    /// Delay strategy between retries.
    pub backoff: BackoffSettings,
    /// Completed jobs retained for inspection.
    pub keep_completed: usize,
    /// Dead jobs retained for inspection.
    pub keep_failed: usize,
    /// Concurrent execution slots in the worker pool.
    pub concurrency: usize,
    /// Optional pool-wide rate limit, executions per second.
    pub rate_limit_per_second: Option<u32>,
}

impl QueueSettings {
    /// Email queue defaults: 3 attempts, exponential backoff from 2s,
    /// 5 slots capped at 10 jobs/second.
    pub fn email_defaults() -> Self {
        Self {
            attempts: 3,
            backoff: BackoffSettings::exponential(2000),
            keep_completed: 100,
            keep_failed: 500,
            concurrency: 5,
            rate_limit_per_second: Some(10),
        }
    }

    /// Notification queue defaults: 2 attempts, fixed 5s backoff, 10 slots.
    pub fn notification_defaults() -> Self {
        Self {
            attempts: 2,
            backoff: BackoffSettings::fixed(5000),
            keep_completed: 200,
            keep_failed: 500,
            concurrency: 10,
            rate_limit_per_second: None,
        }
    }

    /// Lead queue defaults: 3 attempts, exponential backoff from 3s, 3 slots
    /// (lead jobs model heavier external calls).
    pub fn lead_defaults() -> Self {
        Self {
            attempts: 3,
            backoff: BackoffSettings::exponential(3000),
            keep_completed: 100,
            keep_failed: 300,
            concurrency: 3,
            rate_limit_per_second: None,
        }
    }
}

fn default_history_capacity() -> usize {
    1000
}

/// Settings for the whole event/job pipeline.
///
/// Loadable from a TOML file; the Redis section can be overridden through
/// environment variables so deployments need no code changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Queue backend connection.
    pub redis: RedisSettings,

    /// Event bus history capacity.
    pub event_history_capacity: usize,

    /// Email queue policy.
    pub email: QueueSettings,

    /// Notification queue policy.
    pub notification: QueueSettings,

    /// Lead queue policy.
    pub lead: QueueSettings,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            redis: RedisSettings::default(),
            event_history_capacity: default_history_capacity(),
            email: QueueSettings::email_defaults(),
            notification: QueueSettings::notification_defaults(),
            lead: QueueSettings::lead_defaults(),
        }
    }
}

impl PipelineSettings {
    /// Parse settings from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Load(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml(&content)
    }

    /// Load settings: `.env` (if present), then the file named by
    /// `LEADRAIL_CONFIG` (if set), then environment overrides for Redis.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = match std::env::var("LEADRAIL_CONFIG") {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        settings.redis = settings.redis.overlay_env();
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings invariants.
    pub fn validate(&self) -> Result<()> {
        if self.event_history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "event_history_capacity must be at least 1".to_string(),
            ));
        }

        for (name, queue) in [
            ("email", &self.email),
            ("notification", &self.notification),
            ("lead", &self.lead),
        ] {
            if queue.attempts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}: attempts must be at least 1"
                )));
            }
            if queue.concurrency == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}: concurrency must be at least 1"
                )));
            }
            if queue.backoff.delay_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}: backoff delay_ms must be positive"
                )));
            }
            if queue.rate_limit_per_second == Some(0) {
                return Err(ConfigError::Invalid(format!(
                    "{name}: rate_limit_per_second must be positive when set"
                )));
            }
        }

        Ok(())
    }
}
