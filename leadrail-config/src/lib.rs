// Configuration for the Leadrail event and job pipeline
//
// Queue connection parameters and per-queue policy (attempts, backoff,
// retention, concurrency, rate limits) are configurable through TOML files
// and environment variables without code changes.

pub mod error;
pub mod redis;
pub mod settings;

pub use error::{ConfigError, Result};
pub use redis::RedisSettings;
pub use settings::{BackoffKind, BackoffSettings, PipelineSettings, QueueSettings};
