//! Domain model and typed domain events for Leadrail.
//!
//! Events here describe business facts that already happened
//! (`lead.created`, `user.registered`, ...). They are constructed at the
//! moment the fact occurs, published on the event bus, and never persisted.
//! Repository traits are the seams through which job handlers touch the
//! persistence layer.

pub mod events;
pub mod lead;
pub mod repository;

pub use events::{
    LeadCreatedEvent, LeadDeletedEvent, LeadStatusChangedEvent, MemberInvitedEvent,
    SubmissionReceivedEvent, UserRegisteredEvent,
};
pub use lead::{Lead, LeadEnrichment, LeadSource, LeadStatus};
pub use repository::{
    InMemoryLeadRepository, InMemoryNotificationRepository, LeadRepository, NotificationRecord,
    NotificationRepository, RepositoryError, RepositoryResult,
};
