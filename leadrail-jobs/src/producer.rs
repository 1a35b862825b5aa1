//! Typed producer helpers, one per queue family.
//!
//! Producers construct the job payload, apply delivery options and push to
//! the right queue. Broker errors propagate to the caller; swallowing them
//! here would silently lose work.

use crate::types::*;
use leadrail_queue::{Job, JobId, JobPriority, Queue, QueueError, QueueResult};
use serde::Serialize;
use std::time::Duration;

/// Delivery options for a single enqueue.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dispatch {
    /// Priority override; queue default when unset.
    pub priority: Option<JobPriority>,
    /// Visibility delay; immediate when unset.
    pub delay: Option<Duration>,
    /// Caller-supplied job id for dedup/tracing.
    pub job_id: Option<JobId>,
}

impl Dispatch {
    /// Delay visibility by `delay`.
    pub fn delayed(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    /// Override the priority.
    pub fn with_priority(mut self, priority: JobPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Supply an explicit job id.
    pub fn with_job_id(mut self, job_id: JobId) -> Self {
        self.job_id = Some(job_id);
        self
    }
}

fn build_job<T: Serialize>(
    queue: &Queue,
    job_type: &str,
    payload: &T,
    dispatch: Dispatch,
) -> QueueResult<Job> {
    let data =
        serde_json::to_value(payload).map_err(|e| QueueError::Serialization(e.to_string()))?;

    let mut job = queue.job(job_type, data);
    if let Some(priority) = dispatch.priority {
        job = job.with_priority(priority);
    }
    if let Some(delay) = dispatch.delay {
        job = job.schedule_after(chrono::Duration::milliseconds(delay.as_millis() as i64));
    }
    if let Some(job_id) = dispatch.job_id {
        job = job.with_id(job_id);
    }
    Ok(job)
}

/// Producer for the email queue.
#[derive(Clone)]
pub struct EmailJobs {
    queue: Queue,
}

impl EmailJobs {
    pub fn new(queue: Queue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub async fn send_welcome(
        &self,
        payload: WelcomeEmailPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        self.enqueue(EmailJobType::SendWelcome, &payload, dispatch)
            .await
    }

    pub async fn send_lead_alert(
        &self,
        payload: LeadAlertPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        self.enqueue(EmailJobType::SendLeadAlert, &payload, dispatch)
            .await
    }

    pub async fn send_invite(
        &self,
        payload: InviteEmailPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        self.enqueue(EmailJobType::SendInvite, &payload, dispatch)
            .await
    }

    async fn enqueue<T: Serialize>(
        &self,
        job_type: EmailJobType,
        payload: &T,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        let job = build_job(&self.queue, job_type.as_str(), payload, dispatch)?;
        self.queue.enqueue_job(job).await
    }
}

/// Producer for the notification queue.
#[derive(Clone)]
pub struct NotificationJobs {
    queue: Queue,
}

impl NotificationJobs {
    pub fn new(queue: Queue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub async fn create(
        &self,
        payload: NotificationPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        let job = build_job(
            &self.queue,
            NotificationJobType::CreateNotification.as_str(),
            &payload,
            dispatch,
        )?;
        self.queue.enqueue_job(job).await
    }
}

/// Producer for the lead queue.
#[derive(Clone)]
pub struct LeadJobs {
    queue: Queue,
}

impl LeadJobs {
    pub fn new(queue: Queue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub async fn enqueue_enrichment(
        &self,
        payload: EnrichLeadPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        self.enqueue(LeadJobType::EnrichLeadData, &payload, dispatch)
            .await
    }

    pub async fn enqueue_scoring(
        &self,
        payload: ScoreLeadPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        self.enqueue(LeadJobType::CalculateLeadScore, &payload, dispatch)
            .await
    }

    pub async fn enqueue_crm_sync(
        &self,
        payload: CrmSyncPayload,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        self.enqueue(LeadJobType::SyncToCrm, &payload, dispatch)
            .await
    }

    async fn enqueue<T: Serialize>(
        &self,
        job_type: LeadJobType,
        payload: &T,
        dispatch: Dispatch,
    ) -> QueueResult<JobId> {
        let job = build_job(&self.queue, job_type.as_str(), payload, dispatch)?;
        self.queue.enqueue_job(job).await
    }
}
