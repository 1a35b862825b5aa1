//! Job producers, handlers and pipeline wiring for Leadrail.
//!
//! This crate connects the two halves of the pipeline:
//!
//! - **Subscribers** react to domain events on the in-process bus and
//!   enqueue durable jobs — they never perform side effects themselves.
//! - **Job handlers** run inside the worker pools and perform the actual
//!   (stubbed) side effects: emails, in-app notifications, lead enrichment,
//!   scoring and CRM sync.
//!
//! [`Pipeline::build`] wires everything from [`leadrail_config::PipelineSettings`]:
//!
//! ```no_run
//! use leadrail_config::PipelineSettings;
//! use leadrail_domain::*;
//! use leadrail_jobs::handlers::email::LogEmailSender;
//! use leadrail_jobs::handlers::lead::LogCrmClient;
//! use leadrail_jobs::{Collaborators, Pipeline};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = PipelineSettings::load()?;
//!
//!     let mut pipeline = Pipeline::build(
//!         &settings,
//!         Collaborators {
//!             lead_repo: Arc::new(InMemoryLeadRepository::new()),
//!             notification_repo: Arc::new(InMemoryNotificationRepository::new()),
//!             email_sender: Arc::new(LogEmailSender),
//!             crm: Arc::new(LogCrmClient),
//!         },
//!     )
//!     .await?;
//!     pipeline.start()?;
//!
//!     // an application action publishes a fact; side effects run in the
//!     // background from here on
//!     pipeline
//!         .bus()
//!         .publish(LeadCreatedEvent::new(
//!             "l1", "o1", "Jane", "jane@x.com",
//!             LeadStatus::New, LeadSource::Website,
//!         ))
//!         .await;
//!
//!     Ok(())
//! }
//! ```

pub mod handlers;
pub mod pipeline;
pub mod producer;
pub mod subscribers;
pub mod types;

pub use pipeline::{Collaborators, Pipeline};
pub use producer::{Dispatch, EmailJobs, LeadJobs, NotificationJobs};
pub use subscribers::{
    ENRICHMENT_DELAY, LeadCreatedHandler, LeadStatusChangedHandler, MemberInvitedHandler,
    SubmissionReceivedHandler, UserRegisteredHandler,
};
pub use types::*;
