//! Pipeline wiring: settings → bus + queues + producers + worker pools.
//!
//! There is no global bus. Whoever needs to publish or consume gets an
//! explicitly constructed [`Pipeline`]; tests build their own with
//! in-memory collaborators for isolation.

use crate::handlers;
use crate::handlers::email::EmailSender;
use crate::handlers::lead::CrmClient;
use crate::producer::{EmailJobs, LeadJobs, NotificationJobs};
use crate::subscribers::{
    LeadCreatedHandler, LeadStatusChangedHandler, MemberInvitedHandler, SubmissionReceivedHandler,
    UserRegisteredHandler,
};
use crate::types::*;
use leadrail_config::{BackoffKind, BackoffSettings, PipelineSettings, QueueSettings};
use leadrail_domain::{
    LeadCreatedEvent, LeadRepository, LeadStatusChangedEvent, MemberInvitedEvent,
    NotificationRepository, SubmissionReceivedEvent, UserRegisteredEvent,
};
use leadrail_events::{EventBus, EventBusConfig};
use leadrail_queue::{
    BackoffPolicy, Queue, QueueConfig, QueueResult, RateLimit, Worker, WorkerConfig,
};
use std::sync::Arc;
use tracing::info;

/// External collaborators injected into the pipeline.
#[derive(Clone)]
pub struct Collaborators {
    pub lead_repo: Arc<dyn LeadRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub email_sender: Arc<dyn EmailSender>,
    pub crm: Arc<dyn CrmClient>,
}

/// The assembled pipeline: event bus, producers and one worker pool per
/// queue family.
pub struct Pipeline {
    bus: EventBus,
    email_jobs: EmailJobs,
    notification_jobs: NotificationJobs,
    lead_jobs: LeadJobs,
    workers: Vec<Worker>,
}

impl Pipeline {
    /// Connect the queues and wire every subscriber and job handler.
    /// Workers are registered but not started.
    pub async fn build(
        settings: &PipelineSettings,
        collaborators: Collaborators,
    ) -> QueueResult<Self> {
        let redis_url = settings.redis.connection_url();

        let bus = EventBus::with_config(EventBusConfig {
            history_capacity: settings.event_history_capacity,
        });

        let email_queue =
            Queue::with_config(queue_config(&redis_url, EMAIL_QUEUE, &settings.email)).await?;
        let notification_queue = Queue::with_config(queue_config(
            &redis_url,
            NOTIFICATION_QUEUE,
            &settings.notification,
        ))
        .await?;
        let lead_queue =
            Queue::with_config(queue_config(&redis_url, LEAD_QUEUE, &settings.lead)).await?;

        let email_jobs = EmailJobs::new(email_queue.clone());
        let notification_jobs = NotificationJobs::new(notification_queue.clone());
        let lead_jobs = LeadJobs::new(lead_queue.clone());

        bus.subscribe::<LeadCreatedEvent, _>(LeadCreatedHandler::new(
            lead_jobs.clone(),
            notification_jobs.clone(),
        ));
        bus.subscribe::<LeadStatusChangedEvent, _>(LeadStatusChangedHandler::new(
            lead_jobs.clone(),
            notification_jobs.clone(),
        ));
        bus.subscribe::<SubmissionReceivedEvent, _>(SubmissionReceivedHandler::new(
            notification_jobs.clone(),
        ));
        bus.subscribe::<UserRegisteredEvent, _>(UserRegisteredHandler::new(email_jobs.clone()));
        bus.subscribe::<MemberInvitedEvent, _>(MemberInvitedHandler::new(email_jobs.clone()));

        let email_worker = build_email_worker(email_queue, &settings.email, &collaborators);
        let notification_worker =
            build_notification_worker(notification_queue, &settings.notification, &collaborators);
        let lead_worker = build_lead_worker(lead_queue, &settings.lead, &collaborators);

        info!(
            event_types = bus.registered_event_types().len(),
            "pipeline wired"
        );

        Ok(Self {
            bus,
            email_jobs,
            notification_jobs,
            lead_jobs,
            workers: vec![email_worker, notification_worker, lead_worker],
        })
    }

    /// Start every worker pool.
    pub fn start(&mut self) -> QueueResult<()> {
        for worker in &mut self.workers {
            worker.start()?;
        }
        Ok(())
    }

    /// Stop every worker pool.
    pub fn stop(&mut self) -> QueueResult<()> {
        for worker in &mut self.workers {
            worker.stop()?;
        }
        Ok(())
    }

    /// The event bus; application actions publish here.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn email_jobs(&self) -> &EmailJobs {
        &self.email_jobs
    }

    pub fn notification_jobs(&self) -> &NotificationJobs {
        &self.notification_jobs
    }

    pub fn lead_jobs(&self) -> &LeadJobs {
        &self.lead_jobs
    }
}

fn backoff_policy(settings: BackoffSettings) -> BackoffPolicy {
    match settings.kind {
        BackoffKind::Fixed => BackoffPolicy::Fixed {
            delay_ms: settings.delay_ms,
        },
        BackoffKind::Exponential => BackoffPolicy::Exponential {
            base_ms: settings.delay_ms,
        },
    }
}

fn queue_config(redis_url: &str, name: &str, settings: &QueueSettings) -> QueueConfig {
    QueueConfig::new(redis_url, name)
        .with_default_max_attempts(settings.attempts)
        .with_default_backoff(backoff_policy(settings.backoff))
        .with_keep_completed(settings.keep_completed)
        .with_keep_failed(settings.keep_failed)
}

fn worker_config(settings: &QueueSettings) -> WorkerConfig {
    WorkerConfig {
        concurrency: settings.concurrency,
        rate_limit: settings.rate_limit_per_second.map(RateLimit::per_second),
        ..Default::default()
    }
}

fn build_email_worker(
    queue: Queue,
    settings: &QueueSettings,
    collaborators: &Collaborators,
) -> Worker {
    let mut worker = Worker::with_config(queue, worker_config(settings));

    let sender = Arc::clone(&collaborators.email_sender);
    worker.register_handler(EmailJobType::SendWelcome.as_str(), move |job| {
        let sender = Arc::clone(&sender);
        async move { handlers::email::handle_send_welcome(sender.as_ref(), &job).await }
    });

    let sender = Arc::clone(&collaborators.email_sender);
    worker.register_handler(EmailJobType::SendLeadAlert.as_str(), move |job| {
        let sender = Arc::clone(&sender);
        async move { handlers::email::handle_send_lead_alert(sender.as_ref(), &job).await }
    });

    let sender = Arc::clone(&collaborators.email_sender);
    worker.register_handler(EmailJobType::SendInvite.as_str(), move |job| {
        let sender = Arc::clone(&sender);
        async move { handlers::email::handle_send_invite(sender.as_ref(), &job).await }
    });

    worker
}

fn build_notification_worker(
    queue: Queue,
    settings: &QueueSettings,
    collaborators: &Collaborators,
) -> Worker {
    let mut worker = Worker::with_config(queue, worker_config(settings));

    let repo = Arc::clone(&collaborators.notification_repo);
    worker.register_handler(NotificationJobType::CreateNotification.as_str(), move |job| {
        let repo = Arc::clone(&repo);
        async move { handlers::notification::handle_create_notification(repo.as_ref(), &job).await }
    });

    worker
}

fn build_lead_worker(
    queue: Queue,
    settings: &QueueSettings,
    collaborators: &Collaborators,
) -> Worker {
    let mut worker = Worker::with_config(queue, worker_config(settings));

    let repo = Arc::clone(&collaborators.lead_repo);
    worker.register_handler(LeadJobType::EnrichLeadData.as_str(), move |job| {
        let repo = Arc::clone(&repo);
        async move { handlers::lead::handle_enrich_lead(repo.as_ref(), &job).await }
    });

    let repo = Arc::clone(&collaborators.lead_repo);
    worker.register_handler(LeadJobType::CalculateLeadScore.as_str(), move |job| {
        let repo = Arc::clone(&repo);
        async move { handlers::lead::handle_calculate_score(repo.as_ref(), &job).await }
    });

    let repo = Arc::clone(&collaborators.lead_repo);
    let crm = Arc::clone(&collaborators.crm);
    worker.register_handler(LeadJobType::SyncToCrm.as_str(), move |job| {
        let repo = Arc::clone(&repo);
        let crm = Arc::clone(&crm);
        async move { handlers::lead::handle_sync_to_crm(repo.as_ref(), crm.as_ref(), &job).await }
    });

    worker
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_policy_mapping() {
        assert_eq!(
            backoff_policy(BackoffSettings::fixed(5000)),
            BackoffPolicy::Fixed { delay_ms: 5000 }
        );
        assert_eq!(
            backoff_policy(BackoffSettings::exponential(2000)),
            BackoffPolicy::Exponential { base_ms: 2000 }
        );
    }

    #[test]
    fn test_queue_config_mapping() {
        let settings = QueueSettings::lead_defaults();
        let config = queue_config("redis://localhost:6379", LEAD_QUEUE, &settings);

        assert_eq!(config.queue_name, LEAD_QUEUE);
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(
            config.default_backoff,
            BackoffPolicy::Exponential { base_ms: 3000 }
        );
        assert_eq!(config.keep_completed, 100);
        assert_eq!(config.keep_failed, 300);
    }

    #[test]
    fn test_worker_config_mapping() {
        let email = worker_config(&QueueSettings::email_defaults());
        assert_eq!(email.concurrency, 5);
        assert_eq!(email.rate_limit, Some(RateLimit::per_second(10)));

        let lead = worker_config(&QueueSettings::lead_defaults());
        assert_eq!(lead.concurrency, 3);
        assert!(lead.rate_limit.is_none());
    }
}
