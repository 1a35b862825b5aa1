// Leadrail - domain event bus and background job pipeline
//
// Business actions publish immutable domain events on an in-process bus;
// subscribers hand slow or unreliable side effects to durable, retryable
// background jobs processed by per-queue worker pools.

// Re-export the pipeline crates
pub use leadrail_config;
pub use leadrail_domain;
pub use leadrail_events;
pub use leadrail_jobs;
pub use leadrail_queue;

// Prelude for common imports
pub mod prelude {
    pub use leadrail_config::{PipelineSettings, QueueSettings, RedisSettings};
    pub use leadrail_domain::{
        Lead, LeadCreatedEvent, LeadDeletedEvent, LeadSource, LeadStatus, LeadStatusChangedEvent,
        MemberInvitedEvent, SubmissionReceivedEvent, UserRegisteredEvent,
    };
    pub use leadrail_events::{
        Event, EventBus, EventContext, EventHandler, EventHandlerError, EventMetadata,
    };
    pub use leadrail_jobs::{
        Collaborators, Dispatch, EmailJobs, LeadJobs, NotificationJobs, Pipeline,
    };
    pub use leadrail_queue::{
        BackoffPolicy, Job, JobId, JobPriority, JobState, Queue, QueueError, QueueResult, Worker,
        WorkerConfig,
    };
}
