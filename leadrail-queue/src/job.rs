//! Job definition and state management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Job unique identifier.
pub type JobId = Uuid;

/// Job data payload.
pub type JobData = serde_json::Value;

/// Retry delays are capped at one hour.
const MAX_BACKOFF_MS: u64 = 3_600_000;

/// Job priority levels.
///
/// Higher variants are serviced first; within a priority, jobs dequeue FIFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum JobPriority {
    /// Lowest priority
    Low = 0,
    /// Normal priority (default)
    #[default]
    Normal = 1,
    /// High priority
    High = 2,
    /// Critical priority
    Critical = 3,
}

/// Delay strategy applied between retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffPolicy {
    /// Same delay before every retry.
    Fixed { delay_ms: u64 },
    /// Delay doubles per attempt, starting at `base_ms`.
    Exponential { base_ms: u64 },
}

impl BackoffPolicy {
    /// Fixed delay between retries.
    pub fn fixed(delay: Duration) -> Self {
        Self::Fixed {
            delay_ms: delay.as_millis() as u64,
        }
    }

    /// Exponential backoff starting at `base`.
    pub fn exponential(base: Duration) -> Self {
        Self::Exponential {
            base_ms: base.as_millis() as u64,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = match self {
            Self::Fixed { delay_ms } => *delay_ms,
            Self::Exponential { base_ms } => {
                let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
                base_ms.saturating_mul(factor)
            }
        };
        Duration::from_millis(ms.min(MAX_BACKOFF_MS))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Exponential { base_ms: 2000 }
    }
}

/// Job state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    /// Job is waiting to be processed
    Pending,
    /// Job is currently being processed
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed and will be retried
    Failed,
    /// Job failed permanently (max retries exceeded or discarded)
    Dead,
}

/// Job status information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    /// Current state
    pub state: JobState,

    /// Progress percentage (0-100)
    pub progress: u8,

    /// Status message
    pub message: Option<String>,

    /// Error message (if failed)
    pub error: Option<String>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl JobStatus {
    /// Create a new pending status.
    pub fn pending() -> Self {
        Self {
            state: JobState::Pending,
            progress: 0,
            message: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Create a processing status.
    pub fn processing() -> Self {
        Self {
            state: JobState::Processing,
            progress: 0,
            message: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Create a completed status.
    pub fn completed() -> Self {
        Self {
            state: JobState::Completed,
            progress: 100,
            message: None,
            error: None,
            updated_at: Utc::now(),
        }
    }

    /// Create a failed status.
    pub fn failed(error: String) -> Self {
        Self {
            state: JobState::Failed,
            progress: 0,
            message: None,
            error: Some(error),
            updated_at: Utc::now(),
        }
    }

    /// Create a dead status.
    pub fn dead(error: String) -> Self {
        Self {
            state: JobState::Dead,
            progress: 0,
            message: None,
            error: Some(error),
            updated_at: Utc::now(),
        }
    }
}

/// A job to be processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: JobId,

    /// Job type/name
    pub job_type: String,

    /// Job payload data
    pub data: JobData,

    /// Job priority
    pub priority: JobPriority,

    /// Retry delay strategy
    #[serde(default)]
    pub backoff: BackoffPolicy,

    /// Job status
    pub status: JobStatus,

    /// Number of attempts
    pub attempts: u32,

    /// Maximum number of attempts
    pub max_attempts: u32,

    /// Queue name
    pub queue: String,

    /// When the job was created
    pub created_at: DateTime<Utc>,

    /// When the job should be processed (for delayed jobs)
    pub scheduled_at: Option<DateTime<Utc>>,

    /// When the job was started
    pub started_at: Option<DateTime<Utc>>,

    /// When the job completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Job metadata
    pub metadata: HashMap<String, String>,
}

impl Job {
    /// Create a new job.
    pub fn new(queue: impl Into<String>, job_type: impl Into<String>, data: JobData) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            data,
            priority: JobPriority::default(),
            backoff: BackoffPolicy::default(),
            status: JobStatus::pending(),
            attempts: 0,
            max_attempts: 3,
            queue: queue.into(),
            created_at: Utc::now(),
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            metadata: HashMap::new(),
        }
    }

    /// Use a caller-supplied job id (for dedup/tracing).
    pub fn with_id(mut self, id: JobId) -> Self {
        self.id = id;
        self
    }

    /// Set job priority.
    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set max attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the retry backoff policy.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Schedule the job for a point in time.
    pub fn schedule_at(mut self, time: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(time);
        self
    }

    /// Schedule the job after a delay.
    pub fn schedule_after(mut self, duration: chrono::Duration) -> Self {
        self.scheduled_at = Some(Utc::now() + duration);
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Check if the job is ready to be processed.
    pub fn is_ready(&self) -> bool {
        if let Some(scheduled_at) = self.scheduled_at {
            Utc::now() >= scheduled_at
        } else {
            true
        }
    }

    /// Check if the job can be retried.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Mark job as processing.
    pub fn start_processing(&mut self) {
        self.status = JobStatus::processing();
        self.started_at = Some(Utc::now());
        self.attempts += 1;
    }

    /// Mark job as completed.
    pub fn complete(&mut self) {
        self.status = JobStatus::completed();
        self.completed_at = Some(Utc::now());
    }

    /// Mark job as failed; becomes dead once attempts are exhausted.
    pub fn fail(&mut self, error: String) {
        if self.can_retry() {
            self.status = JobStatus::failed(error);
        } else {
            self.status = JobStatus::dead(error);
            self.completed_at = Some(Utc::now());
        }
    }

    /// Mark the job permanently failed regardless of remaining attempts.
    pub fn discard(&mut self, error: String) {
        self.status = JobStatus::dead(error);
        self.completed_at = Some(Utc::now());
    }

    /// Update job progress.
    pub fn update_progress(&mut self, progress: u8, message: Option<String>) {
        self.status.progress = progress.min(100);
        self.status.message = message;
        self.status.updated_at = Utc::now();
    }

    /// Delay to wait before the next retry of this job.
    pub fn backoff_delay(&self) -> chrono::Duration {
        let delay = self.backoff.delay_for(self.attempts);
        chrono::Duration::milliseconds(delay.as_millis() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_creation() {
        let job = Job::new(
            "email",
            "send_welcome",
            serde_json::json!({"to": "test@example.com"}),
        );

        assert_eq!(job.queue, "email");
        assert_eq!(job.job_type, "send_welcome");
        assert_eq!(job.attempts, 0);
        assert_eq!(job.priority, JobPriority::Normal);
        assert_eq!(job.backoff, BackoffPolicy::Exponential { base_ms: 2000 });
    }

    #[test]
    fn test_job_builder() {
        let job = Job::new("email", "task", serde_json::json!({}))
            .with_priority(JobPriority::High)
            .with_max_attempts(5)
            .with_backoff(BackoffPolicy::fixed(Duration::from_secs(5)))
            .with_metadata("organization_id", "org-1");

        assert_eq!(job.priority, JobPriority::High);
        assert_eq!(job.max_attempts, 5);
        assert_eq!(job.backoff, BackoffPolicy::Fixed { delay_ms: 5000 });
        assert_eq!(
            job.metadata.get("organization_id"),
            Some(&"org-1".to_string())
        );
    }

    #[test]
    fn test_job_with_explicit_id() {
        let id = Uuid::new_v4();
        let job = Job::new("email", "task", serde_json::json!({})).with_id(id);
        assert_eq!(job.id, id);
    }

    #[test]
    fn test_job_ready() {
        let job = Job::new("email", "task", serde_json::json!({}));
        assert!(job.is_ready());

        let delayed = Job::new("email", "task", serde_json::json!({}))
            .schedule_at(Utc::now() + chrono::Duration::hours(1));
        assert!(!delayed.is_ready());

        let past = Job::new("email", "task", serde_json::json!({}))
            .schedule_at(Utc::now() - chrono::Duration::hours(1));
        assert!(past.is_ready());
    }

    #[test]
    fn test_job_retry_logic() {
        let mut job = Job::new("email", "task", serde_json::json!({})).with_max_attempts(3);

        assert!(job.can_retry());

        job.start_processing();
        job.fail("Error 1".to_string());
        assert!(job.can_retry());
        assert_eq!(job.status.state, JobState::Failed);

        job.start_processing();
        job.fail("Error 2".to_string());
        assert!(job.can_retry());

        job.start_processing();
        job.fail("Error 3".to_string());
        assert!(!job.can_retry());
        assert_eq!(job.status.state, JobState::Dead);
        assert_eq!(job.attempts, 3);
    }

    #[test]
    fn test_discard_skips_retries() {
        let mut job = Job::new("email", "task", serde_json::json!({}));

        job.start_processing();
        job.discard("unknown job type".to_string());

        assert!(job.can_retry()); // attempts not exhausted...
        assert_eq!(job.status.state, JobState::Dead); // ...but the job is dead anyway
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_fixed_backoff_delay() {
        let policy = BackoffPolicy::fixed(Duration::from_secs(5));

        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(5));
        assert_eq!(policy.delay_for(10), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_backoff_delay() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(2));

        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
        assert_eq!(policy.delay_for(3), Duration::from_secs(8));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = BackoffPolicy::exponential(Duration::from_secs(2));
        assert_eq!(policy.delay_for(30), Duration::from_millis(3_600_000));
    }

    #[test]
    fn test_job_backoff_delay_uses_policy() {
        let mut job = Job::new("email", "task", serde_json::json!({}))
            .with_backoff(BackoffPolicy::exponential(Duration::from_secs(3)));

        job.attempts = 1;
        assert_eq!(job.backoff_delay(), chrono::Duration::seconds(3));

        job.attempts = 2;
        assert_eq!(job.backoff_delay(), chrono::Duration::seconds(6));
    }

    #[test]
    fn test_job_priority_ordering() {
        assert!(JobPriority::Low < JobPriority::Normal);
        assert!(JobPriority::Normal < JobPriority::High);
        assert!(JobPriority::High < JobPriority::Critical);
    }

    #[test]
    fn test_job_status_transitions() {
        let mut job = Job::new("email", "task", serde_json::json!({}));

        assert_eq!(job.status.state, JobState::Pending);

        job.start_processing();
        assert_eq!(job.status.state, JobState::Processing);
        assert_eq!(job.attempts, 1);

        job.complete();
        assert_eq!(job.status.state, JobState::Completed);
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_job_failure_tracking() {
        let mut job = Job::new("email", "task", serde_json::json!({}));

        job.start_processing();
        job.fail("First error".to_string());

        assert_eq!(job.status.state, JobState::Failed);
        assert_eq!(job.status.error, Some("First error".to_string()));
        assert_eq!(job.attempts, 1);
    }

    #[test]
    fn test_job_progress_update() {
        let mut job = Job::new("lead", "enrich_lead_data", serde_json::json!({}));

        job.update_progress(140, Some("clamped".to_string()));
        assert_eq!(job.status.progress, 100);
        assert_eq!(job.status.message.as_deref(), Some("clamped"));
    }

    #[test]
    fn test_job_id_uniqueness() {
        let job1 = Job::new("email", "task", serde_json::json!({}));
        let job2 = Job::new("email", "task", serde_json::json!({}));

        assert_ne!(job1.id, job2.id);
    }

    #[test]
    fn test_backoff_policy_serde_roundtrip() {
        let fixed = BackoffPolicy::fixed(Duration::from_secs(5));
        let json = serde_json::to_string(&fixed).unwrap();
        assert!(json.contains("fixed"));
        let back: BackoffPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fixed);
    }
}
