//! Worker implementation for processing jobs.

use crate::error::{QueueError, QueueResult};
use crate::job::Job;
use crate::queue::Queue;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Job handler function type.
pub type JobHandler =
    Arc<dyn Fn(Job) -> Pin<Box<dyn Future<Output = QueueResult<()>> + Send>> + Send + Sync>;

/// Pool-wide execution rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// Executions allowed per window (also the burst capacity).
    pub permits: u32,
    /// Window the permits refill over.
    pub per: Duration,
}

impl RateLimit {
    /// `permits` executions per second.
    pub fn per_second(permits: u32) -> Self {
        Self {
            permits,
            per: Duration::from_secs(1),
        }
    }
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Single token bucket shared by all slots of a pool.
struct TokenBucket {
    capacity: f64,
    refill_per_sec: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    fn new(limit: RateLimit) -> Self {
        let capacity = limit.permits as f64;
        Self {
            capacity,
            refill_per_sec: capacity / limit.per.as_secs_f64(),
            state: Mutex::new(BucketState {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent job executions
    pub concurrency: usize,

    /// Poll interval for checking new jobs
    pub poll_interval: Duration,

    /// Timeout for a single job execution; a timeout counts as a failed
    /// attempt and follows the normal retry path
    pub job_timeout: Duration,

    /// Optional pool-wide execution rate limit
    pub rate_limit: Option<RateLimit>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 10,
            poll_interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(300), // 5 minutes
            rate_limit: None,
        }
    }
}

/// Worker pool consuming one queue.
///
/// Runs `concurrency` polling slots; each dequeues a job, dispatches by
/// `job_type` to the registered handler, and reports the outcome back to
/// the queue. A slow job occupies one slot only.
pub struct Worker {
    queue: Queue,
    handlers: HashMap<String, JobHandler>,
    config: WorkerConfig,
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl Worker {
    /// Create a new worker.
    pub fn new(queue: Queue) -> Self {
        Self::with_config(queue, WorkerConfig::default())
    }

    /// Create a worker with custom configuration.
    pub fn with_config(queue: Queue, config: WorkerConfig) -> Self {
        Self {
            queue,
            handlers: HashMap::new(),
            config,
            running: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Register a job handler.
    ///
    /// Register all handlers before calling [`Worker::start`]; a job whose
    /// type has no handler is discarded to the dead set without retries.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use leadrail_queue::*;
    ///
    /// # async fn example() -> QueueResult<()> {
    /// let queue = Queue::new("redis://localhost:6379", "email").await?;
    /// let mut worker = Worker::new(queue);
    ///
    /// worker.register_handler("send_welcome", |job| async move {
    ///     // send the email here
    ///     let _ = job.data;
    ///     Ok(())
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn register_handler<F, Fut>(&mut self, job_type: impl Into<String>, handler: F)
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QueueResult<()>> + Send + 'static,
    {
        let wrapped: JobHandler = Arc::new(move |job: Job| Box::pin(handler(job)));
        self.handlers.insert(job_type.into(), wrapped);
    }

    /// Start the worker slots.
    pub fn start(&mut self) -> QueueResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(QueueError::WorkerAlreadyRunning);
        }

        info!(
            queue = %self.queue.name(),
            concurrency = self.config.concurrency,
            "starting worker pool"
        );

        let handlers = Arc::new(self.handlers.clone());
        let limiter = self.config.rate_limit.map(|l| Arc::new(TokenBucket::new(l)));

        for slot in 0..self.config.concurrency {
            let queue = self.queue.clone();
            let handlers = Arc::clone(&handlers);
            let running = Arc::clone(&self.running);
            let limiter = limiter.clone();
            let poll_interval = self.config.poll_interval;
            let job_timeout = self.config.job_timeout;

            let handle = tokio::spawn(async move {
                while running.load(Ordering::SeqCst) {
                    if let Some(limiter) = &limiter
                        && !limiter.try_acquire()
                    {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        continue;
                    }

                    match queue.dequeue().await {
                        Ok(Some(job)) => {
                            process_job(slot, &queue, &handlers, job, job_timeout).await;
                        }
                        Ok(None) => {
                            tokio::time::sleep(poll_interval).await;
                        }
                        Err(e) => {
                            error!(slot, error = %e, "failed to dequeue job");
                            tokio::time::sleep(poll_interval).await;
                        }
                    }
                }

                debug!(slot, "worker slot stopped");
            });

            self.handles.push(handle);
        }

        Ok(())
    }

    /// Stop the worker.
    pub fn stop(&mut self) -> QueueResult<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(QueueError::WorkerNotRunning);
        }

        for handle in self.handles.drain(..) {
            handle.abort();
        }

        info!(queue = %self.queue.name(), "worker pool stopped");
        Ok(())
    }

    /// Check if the worker is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

async fn process_job(
    slot: usize,
    queue: &Queue,
    handlers: &HashMap<String, JobHandler>,
    job: Job,
    job_timeout: Duration,
) {
    let job_id = job.id;
    let job_type = job.job_type.clone();

    debug!(slot, job_id = %job_id, job_type = %job_type, "processing job");

    let Some(handler) = handlers.get(&job_type) else {
        // unknown type can never succeed, retrying would only burn attempts
        let reason = QueueError::NoHandler(job_type.clone());
        error!(slot, job_id = %job_id, job_type = %job_type, "no handler for job type, discarding");
        if let Err(e) = queue.fail_fatal(job_id, reason.to_string()).await {
            error!(slot, job_id = %job_id, error = %e, "failed to discard job");
        }
        return;
    };

    match tokio::time::timeout(job_timeout, handler(job.clone())).await {
        Ok(Ok(())) => {
            if let Err(e) = queue.complete(job_id).await {
                error!(slot, job_id = %job_id, error = %e, "failed to mark job completed");
            } else {
                info!(slot, job_id = %job_id, job_type = %job_type, "job completed");
            }
        }
        Ok(Err(e)) => {
            warn!(slot, job_id = %job_id, job_type = %job_type, error = %e, "job handler failed");
            if let Err(err) = queue.fail(job_id, e.to_string()).await {
                error!(slot, job_id = %job_id, error = %err, "failed to mark job failed");
            }
        }
        Err(_) => {
            warn!(slot, job_id = %job_id, job_type = %job_type, "job execution timed out");
            if let Err(e) = queue
                .fail(job_id, "job execution timed out".to_string())
                .await
            {
                error!(slot, job_id = %job_id, error = %e, "failed to mark job failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::default();
        assert_eq!(config.concurrency, 10);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.job_timeout, Duration::from_secs(300));
        assert!(config.rate_limit.is_none());
    }

    #[test]
    fn test_rate_limit_per_second() {
        let limit = RateLimit::per_second(10);
        assert_eq!(limit.permits, 10);
        assert_eq!(limit.per, Duration::from_secs(1));
    }

    #[test]
    fn test_token_bucket_allows_burst_then_denies() {
        let bucket = TokenBucket::new(RateLimit::per_second(5));

        for _ in 0..5 {
            assert!(bucket.try_acquire());
        }
        assert!(!bucket.try_acquire());
    }

    #[test]
    fn test_token_bucket_refills_over_time() {
        let bucket = TokenBucket::new(RateLimit {
            permits: 2,
            per: Duration::from_millis(100),
        });

        assert!(bucket.try_acquire());
        assert!(bucket.try_acquire());
        assert!(!bucket.try_acquire());

        std::thread::sleep(Duration::from_millis(120));
        assert!(bucket.try_acquire());
    }
}
