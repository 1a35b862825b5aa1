//! Queue implementation with Redis backend.

use crate::error::{QueueError, QueueResult};
use crate::job::{BackoffPolicy, Job, JobData, JobId, JobPriority, JobState};
use chrono::Utc;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Redis connection URL
    pub redis_url: String,

    /// Queue name
    pub queue_name: String,

    /// Key prefix for Redis keys
    pub key_prefix: String,

    /// Maximum queue size (0 = unlimited)
    pub max_size: usize,

    /// TTL on stored job records
    pub retention_time: Duration,

    /// How many completed jobs to retain for inspection
    pub keep_completed: usize,

    /// How many dead jobs to retain for inspection
    pub keep_failed: usize,

    /// Default max attempts applied at enqueue
    pub default_max_attempts: u32,

    /// Default retry backoff applied at enqueue
    pub default_backoff: BackoffPolicy,
}

impl QueueConfig {
    /// Create a new queue configuration.
    pub fn new(redis_url: impl Into<String>, queue_name: impl Into<String>) -> Self {
        let queue_name = queue_name.into();
        Self {
            redis_url: redis_url.into(),
            key_prefix: format!("leadrail:queue:{}", queue_name),
            queue_name,
            max_size: 0,
            retention_time: Duration::from_secs(86400), // 24 hours
            keep_completed: 100,
            keep_failed: 500,
            default_max_attempts: 3,
            default_backoff: BackoffPolicy::default(),
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the maximum queue size.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Set the TTL for stored job records.
    pub fn with_retention_time(mut self, retention_time: Duration) -> Self {
        self.retention_time = retention_time;
        self
    }

    /// Set how many completed jobs are retained.
    pub fn with_keep_completed(mut self, keep_completed: usize) -> Self {
        self.keep_completed = keep_completed;
        self
    }

    /// Set how many dead jobs are retained.
    pub fn with_keep_failed(mut self, keep_failed: usize) -> Self {
        self.keep_failed = keep_failed;
        self
    }

    /// Set the default max attempts for jobs on this queue.
    pub fn with_default_max_attempts(mut self, attempts: u32) -> Self {
        self.default_max_attempts = attempts;
        self
    }

    /// Set the default retry backoff for jobs on this queue.
    pub fn with_default_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.default_backoff = backoff;
        self
    }

    /// Build Redis key.
    fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.key_prefix, suffix)
    }
}

/// Per-state entry counts for a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueCounts {
    pub pending: usize,
    pub delayed: usize,
    pub processing: usize,
    pub completed: usize,
    pub dead: usize,
}

/// Job queue backed by Redis.
///
/// Producers append; one worker pool consumes. Dequeue order is priority
/// first, then FIFO within a priority, honoring each job's `scheduled_at`.
#[derive(Clone)]
pub struct Queue {
    connection: ConnectionManager,
    config: QueueConfig,
}

impl Queue {
    /// Create a new queue.
    pub async fn new(
        redis_url: impl Into<String>,
        queue_name: impl Into<String>,
    ) -> QueueResult<Self> {
        let config = QueueConfig::new(redis_url, queue_name);
        Self::with_config(config).await
    }

    /// Create a queue with custom configuration.
    pub async fn with_config(config: QueueConfig) -> QueueResult<Self> {
        info!(queue = %config.queue_name, "initializing job queue");
        debug!(
            queue = %config.queue_name,
            prefix = %config.key_prefix,
            max_size = config.max_size,
            "queue configuration"
        );

        let client = Client::open(config.redis_url.as_str())
            .map_err(|e| QueueError::Config(e.to_string()))?;

        let connection = ConnectionManager::new(client).await?;

        info!(queue = %config.queue_name, "job queue ready");
        Ok(Self { connection, config })
    }

    /// Queue name.
    pub fn name(&self) -> &str {
        &self.config.queue_name
    }

    /// Build a job for this queue with the queue's default policy applied.
    ///
    /// The returned job can be customized (priority, delay, explicit id)
    /// before being passed to [`Queue::enqueue_job`].
    pub fn job(&self, job_type: impl Into<String>, data: JobData) -> Job {
        Job::new(&self.config.queue_name, job_type, data)
            .with_max_attempts(self.config.default_max_attempts)
            .with_backoff(self.config.default_backoff)
    }

    /// Enqueue a job with the queue's default policy.
    pub async fn enqueue(&self, job_type: impl Into<String>, data: JobData) -> QueueResult<JobId> {
        self.enqueue_job(self.job(job_type, data)).await
    }

    /// Enqueue a fully-built job.
    ///
    /// Broker errors propagate to the caller; a silently lost job would
    /// break the at-least-once contract.
    pub async fn enqueue_job(&self, job: Job) -> QueueResult<JobId> {
        if self.config.max_size > 0 {
            let size = self.size().await?;
            if size >= self.config.max_size {
                return Err(QueueError::QueueFull);
            }
        }

        let job_id = job.id;
        let mut conn = self.connection.clone();

        let job_json =
            serde_json::to_string(&job).map_err(|e| QueueError::Serialization(e.to_string()))?;

        let job_key = self.config.key(&format!("job:{}", job_id));
        let _: () = conn
            .set_ex(&job_key, job_json, self.config.retention_time.as_secs())
            .await?;

        if job.is_ready() {
            let queue_key = self.priority_queue_key(job.priority);
            let score = -(job.priority as i64); // negative so higher priority pops first
            let _: () = conn.zadd(&queue_key, job_id.to_string(), score).await?;
        } else {
            let delayed_key = self.config.key("delayed");
            let score = job.scheduled_at.unwrap().timestamp_millis();
            let _: () = conn.zadd(&delayed_key, job_id.to_string(), score).await?;
        }

        info!(
            queue = %self.config.queue_name,
            job_id = %job_id,
            job_type = %job.job_type,
            priority = ?job.priority,
            delayed = !job.is_ready(),
            "job enqueued"
        );
        Ok(job_id)
    }

    /// Dequeue the next ready job, claiming it for the caller.
    pub async fn dequeue(&self) -> QueueResult<Option<Job>> {
        self.move_delayed_jobs().await?;

        let mut conn = self.connection.clone();

        for priority in [
            JobPriority::Critical,
            JobPriority::High,
            JobPriority::Normal,
            JobPriority::Low,
        ] {
            let queue_key = self.priority_queue_key(priority);

            let result: Option<Vec<String>> = conn.zpopmin(&queue_key, 1).await?;

            if let Some(items) = result
                && let Some(job_id_str) = items.first()
                && let Ok(job_id) = job_id_str.parse::<JobId>()
                && let Some(mut job) = self.get_job(job_id).await?
            {
                job.start_processing();
                self.save_job(&job).await?;

                let processing_key = self.config.key("processing");
                let _: () = conn
                    .zadd(&processing_key, job_id.to_string(), Utc::now().timestamp())
                    .await?;

                return Ok(Some(job));
            }
        }

        Ok(None)
    }

    /// Complete a job, moving it to the bounded completed set.
    pub async fn complete(&self, job_id: JobId) -> QueueResult<()> {
        if let Some(mut job) = self.get_job(job_id).await? {
            job.complete();
            self.save_job(&job).await?;
            self.remove_from_processing(job_id).await?;

            let mut conn = self.connection.clone();
            let completed_key = self.config.key("completed");
            let _: () = conn
                .zadd(&completed_key, job_id.to_string(), Utc::now().timestamp_millis())
                .await?;
            self.trim(&completed_key, self.config.keep_completed).await?;

            debug!(
                queue = %self.config.queue_name,
                job_id = %job_id,
                attempts = job.attempts,
                "job completed"
            );
        }
        Ok(())
    }

    /// Fail a job attempt.
    ///
    /// With attempts remaining the job is re-scheduled after its backoff
    /// delay; otherwise it moves to the bounded dead set, retained for
    /// inspection.
    pub async fn fail(&self, job_id: JobId, error: String) -> QueueResult<()> {
        if let Some(mut job) = self.get_job(job_id).await? {
            job.fail(error);

            if job.status.state == JobState::Failed && job.can_retry() {
                let delay = job.backoff_delay();
                let retry_at = Utc::now() + delay;
                job.scheduled_at = Some(retry_at);
                self.save_job(&job).await?;

                let mut conn = self.connection.clone();
                let delayed_key = self.config.key("delayed");
                let _: () = conn
                    .zadd(&delayed_key, job_id.to_string(), retry_at.timestamp_millis())
                    .await?;

                warn!(
                    queue = %self.config.queue_name,
                    job_id = %job_id,
                    job_type = %job.job_type,
                    attempts = job.attempts,
                    max_attempts = job.max_attempts,
                    retry_in_ms = delay.num_milliseconds(),
                    "job attempt failed, retry scheduled"
                );
            } else {
                self.save_job(&job).await?;
                self.push_dead(job_id).await?;

                error!(
                    queue = %self.config.queue_name,
                    job_id = %job_id,
                    job_type = %job.job_type,
                    attempts = job.attempts,
                    "job failed permanently"
                );
            }

            self.remove_from_processing(job_id).await?;
        }
        Ok(())
    }

    /// Fail a job permanently without consuming its remaining attempts.
    ///
    /// Used for non-retriable conditions such as an unknown job type.
    pub async fn fail_fatal(&self, job_id: JobId, error: String) -> QueueResult<()> {
        if let Some(mut job) = self.get_job(job_id).await? {
            job.discard(error);
            self.save_job(&job).await?;
            self.push_dead(job_id).await?;
            self.remove_from_processing(job_id).await?;

            error!(
                queue = %self.config.queue_name,
                job_id = %job_id,
                job_type = %job.job_type,
                "job discarded"
            );
        }
        Ok(())
    }

    /// Get a job by ID.
    pub async fn get_job(&self, job_id: JobId) -> QueueResult<Option<Job>> {
        let mut conn = self.connection.clone();
        let job_key = self.config.key(&format!("job:{}", job_id));

        let job_json: Option<String> = conn.get(&job_key).await?;

        if let Some(json) = job_json {
            let job: Job = serde_json::from_str(&json)
                .map_err(|e| QueueError::Deserialization(e.to_string()))?;
            Ok(Some(job))
        } else {
            Ok(None)
        }
    }

    /// Save a job.
    async fn save_job(&self, job: &Job) -> QueueResult<()> {
        let mut conn = self.connection.clone();
        let job_key = self.config.key(&format!("job:{}", job.id));
        let job_json =
            serde_json::to_string(job).map_err(|e| QueueError::Serialization(e.to_string()))?;

        let _: () = conn
            .set_ex(&job_key, job_json, self.config.retention_time.as_secs())
            .await?;
        Ok(())
    }

    /// Number of jobs ready to be dequeued.
    pub async fn size(&self) -> QueueResult<usize> {
        let mut conn = self.connection.clone();
        let mut total = 0;

        for priority in [
            JobPriority::Critical,
            JobPriority::High,
            JobPriority::Normal,
            JobPriority::Low,
        ] {
            let queue_key = self.priority_queue_key(priority);
            let count: usize = conn.zcard(&queue_key).await?;
            total += count;
        }

        Ok(total)
    }

    /// Per-state entry counts, for health checks.
    pub async fn counts(&self) -> QueueResult<QueueCounts> {
        let mut conn = self.connection.clone();

        let delayed: usize = conn.zcard(self.config.key("delayed")).await?;
        let processing: usize = conn.zcard(self.config.key("processing")).await?;
        let completed: usize = conn.zcard(self.config.key("completed")).await?;
        let dead: usize = conn.zcard(self.config.key("dead")).await?;

        Ok(QueueCounts {
            pending: self.size().await?,
            delayed,
            processing,
            completed,
            dead,
        })
    }

    /// Most recent dead jobs, newest first, for inspection.
    pub async fn dead_jobs(&self, limit: usize) -> QueueResult<Vec<Job>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.connection.clone();
        let dead_key = self.config.key("dead");
        let job_ids: Vec<String> = conn.zrevrange(&dead_key, 0, limit as isize - 1).await?;

        let mut jobs = Vec::with_capacity(job_ids.len());
        for job_id_str in job_ids {
            if let Ok(job_id) = job_id_str.parse::<JobId>()
                && let Some(job) = self.get_job(job_id).await?
            {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    /// Move delayed jobs whose time has come onto the ready queues.
    async fn move_delayed_jobs(&self) -> QueueResult<()> {
        let mut conn = self.connection.clone();
        let delayed_key = self.config.key("delayed");
        let now = Utc::now().timestamp_millis();

        let job_ids: Vec<String> = conn.zrangebyscore(&delayed_key, "-inf", now).await?;

        for job_id_str in job_ids {
            if let Ok(job_id) = job_id_str.parse::<JobId>()
                && let Some(job) = self.get_job(job_id).await?
                && job.is_ready()
            {
                let _: () = conn.zrem(&delayed_key, job_id.to_string()).await?;

                let queue_key = self.priority_queue_key(job.priority);
                let score = -(job.priority as i64);
                let _: () = conn.zadd(&queue_key, job_id.to_string(), score).await?;
            }
        }

        Ok(())
    }

    async fn push_dead(&self, job_id: JobId) -> QueueResult<()> {
        let mut conn = self.connection.clone();
        let dead_key = self.config.key("dead");
        let _: () = conn
            .zadd(&dead_key, job_id.to_string(), Utc::now().timestamp_millis())
            .await?;
        self.trim(&dead_key, self.config.keep_failed).await
    }

    /// Keep only the newest `keep` members of a time-scored set.
    async fn trim(&self, key: &str, keep: usize) -> QueueResult<()> {
        let mut conn = self.connection.clone();
        let _: () = conn
            .zremrangebyrank(key, 0, -(keep as isize) - 1)
            .await?;
        Ok(())
    }

    /// Remove job from processing set.
    async fn remove_from_processing(&self, job_id: JobId) -> QueueResult<()> {
        let mut conn = self.connection.clone();
        let processing_key = self.config.key("processing");
        let _: () = conn.zrem(&processing_key, job_id.to_string()).await?;
        Ok(())
    }

    /// Get the priority queue key.
    fn priority_queue_key(&self, priority: JobPriority) -> String {
        self.config
            .key(&format!("pending:{:?}", priority).to_lowercase())
    }

    /// Clear all jobs from the queue.
    pub async fn clear(&self) -> QueueResult<()> {
        let mut conn = self.connection.clone();

        let pattern = format!("{}:*", self.config.key_prefix);
        let keys: Vec<String> = conn.keys(&pattern).await?;

        if !keys.is_empty() {
            let _: () = conn.del(keys).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_config() {
        let config = QueueConfig::new("redis://localhost:6379", "email");
        assert_eq!(config.queue_name, "email");
        assert!(config.key_prefix.contains("email"));
        assert_eq!(config.keep_completed, 100);
        assert_eq!(config.keep_failed, 500);
    }

    #[test]
    fn test_queue_config_builder() {
        let config = QueueConfig::new("redis://localhost:6379", "lead")
            .with_key_prefix("app:lead")
            .with_max_size(1000)
            .with_retention_time(Duration::from_secs(7200))
            .with_keep_completed(100)
            .with_keep_failed(300)
            .with_default_max_attempts(3)
            .with_default_backoff(BackoffPolicy::exponential(Duration::from_secs(3)));

        assert_eq!(config.key_prefix, "app:lead");
        assert_eq!(config.max_size, 1000);
        assert_eq!(config.retention_time, Duration::from_secs(7200));
        assert_eq!(config.keep_failed, 300);
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(
            config.default_backoff,
            BackoffPolicy::Exponential { base_ms: 3000 }
        );
    }

    #[test]
    fn test_queue_config_default_retention() {
        let config = QueueConfig::new("redis://localhost:6379", "email");
        assert_eq!(config.retention_time, Duration::from_secs(86400));
        assert_eq!(config.max_size, 0); // unlimited
    }

    #[test]
    fn test_queue_key_generation() {
        let config = QueueConfig::new("redis://localhost:6379", "notification");

        assert!(config.key("pending:normal").contains("notification"));
        assert!(config.key("delayed").ends_with(":delayed"));
        assert_ne!(config.key("dead"), config.key("completed"));
    }

    #[test]
    fn test_queue_config_different_queues_do_not_collide() {
        let config1 = QueueConfig::new("redis://localhost:6379", "email");
        let config2 = QueueConfig::new("redis://localhost:6379", "lead");

        assert_ne!(config1.key_prefix, config2.key_prefix);
        assert_ne!(config1.key("pending:normal"), config2.key("pending:normal"));
    }
}
