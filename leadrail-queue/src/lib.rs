//! Job queue and background processing for Leadrail.
//!
//! Slow or unreliable side effects (emails, CRM syncs, lead enrichment) are
//! deferred here instead of running inside the request path:
//! - Redis-backed persistence
//! - Automatic retries with fixed or exponential backoff
//! - Job priorities and delayed/scheduled jobs
//! - Bounded dead set for permanently failed jobs
//! - Per-queue worker pools with bounded concurrency and optional rate limits
//!
//! ## Job Creation
//!
//! ```
//! use leadrail_queue::{Job, JobPriority};
//! use serde_json::json;
//!
//! let job = Job::new("email", "send_welcome", json!({"to": "user@example.com"}));
//!
//! assert_eq!(job.queue, "email");
//! assert_eq!(job.job_type, "send_welcome");
//! assert_eq!(job.priority, JobPriority::Normal);
//! ```
//!
//! ## Priorities and Delays
//!
//! ```
//! use leadrail_queue::{Job, JobPriority};
//! use serde_json::json;
//! use chrono::Duration;
//!
//! let urgent = Job::new("lead", "sync_to_crm", json!({}))
//!     .with_priority(JobPriority::High);
//!
//! let deferred = Job::new("lead", "enrich_lead_data", json!({}))
//!     .schedule_after(Duration::seconds(5));
//!
//! assert!(urgent.priority > JobPriority::Normal);
//! assert!(deferred.scheduled_at.is_some());
//! ```
//!
//! ## Backoff Policies
//!
//! ```
//! use leadrail_queue::BackoffPolicy;
//! use std::time::Duration;
//!
//! let fixed = BackoffPolicy::fixed(Duration::from_secs(5));
//! let exponential = BackoffPolicy::exponential(Duration::from_secs(2));
//!
//! assert_eq!(fixed.delay_for(3), Duration::from_secs(5));
//! assert_eq!(exponential.delay_for(3), Duration::from_secs(8));
//! ```
//!
//! ## Complete Example
//!
//! ```no_run
//! use leadrail_queue::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), QueueError> {
//!     let queue = Queue::new("redis://localhost:6379", "email").await?;
//!
//!     let job_id = queue.enqueue(
//!         "send_welcome",
//!         serde_json::json!({"to": "user@example.com"}),
//!     ).await?;
//!     println!("enqueued {job_id}");
//!
//!     let mut worker = Worker::new(queue);
//!     worker.register_handler("send_welcome", |job| async move {
//!         // send the email here
//!         let _ = job.data;
//!         Ok(())
//!     });
//!     worker.start()?;
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod job;
pub mod queue;
pub mod worker;

pub use error::{QueueError, QueueResult};
pub use job::{BackoffPolicy, Job, JobData, JobId, JobPriority, JobState, JobStatus};
pub use queue::{Queue, QueueConfig, QueueCounts};
pub use worker::{JobHandler, RateLimit, Worker, WorkerConfig};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{QueueError, QueueResult};
    pub use crate::job::{BackoffPolicy, Job, JobData, JobId, JobPriority, JobState, JobStatus};
    pub use crate::queue::{Queue, QueueConfig, QueueCounts};
    pub use crate::worker::{JobHandler, RateLimit, Worker, WorkerConfig};
}
