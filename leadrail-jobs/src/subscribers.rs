//! Event subscribers: the bridge from domain events to background jobs.
//!
//! Subscribers run inside the bus's fan-out, so they must stay quick and
//! must not perform the side effect themselves. Anything that needs
//! guaranteed execution is enqueued; an enqueue failure surfaces as a
//! handler error for the bus to log, never as a failure of the publishing
//! request.

use crate::producer::{Dispatch, EmailJobs, LeadJobs, NotificationJobs};
use crate::types::*;
use async_trait::async_trait;
use leadrail_domain::{
    LeadCreatedEvent, LeadStatusChangedEvent, MemberInvitedEvent, SubmissionReceivedEvent,
    UserRegisteredEvent,
};
use leadrail_events::{EventHandler, EventHandlerError};
use leadrail_queue::{JobPriority, QueueError};
use std::time::Duration;

/// Delay before enriching a freshly created lead, giving the rest of the
/// creating transaction time to settle.
pub const ENRICHMENT_DELAY: Duration = Duration::from_secs(5);

fn enqueue_error(e: QueueError) -> EventHandlerError {
    EventHandlerError::ProcessingError(e.to_string())
}

/// Kicks off enrichment, scoring and an in-app notification for new leads.
pub struct LeadCreatedHandler {
    leads: LeadJobs,
    notifications: NotificationJobs,
}

impl LeadCreatedHandler {
    pub fn new(leads: LeadJobs, notifications: NotificationJobs) -> Self {
        Self {
            leads,
            notifications,
        }
    }
}

#[async_trait]
impl EventHandler<LeadCreatedEvent> for LeadCreatedHandler {
    async fn handle(&self, event: &LeadCreatedEvent) -> Result<(), EventHandlerError> {
        self.leads
            .enqueue_enrichment(
                EnrichLeadPayload {
                    lead_id: event.lead_id.clone(),
                    organization_id: event.organization_id.clone(),
                },
                Dispatch::delayed(ENRICHMENT_DELAY),
            )
            .await
            .map_err(enqueue_error)?;

        self.leads
            .enqueue_scoring(
                ScoreLeadPayload {
                    lead_id: event.lead_id.clone(),
                    organization_id: event.organization_id.clone(),
                },
                Dispatch::default(),
            )
            .await
            .map_err(enqueue_error)?;

        self.notifications
            .create(
                NotificationPayload {
                    organization_id: event.organization_id.clone(),
                    title: "New lead".to_string(),
                    body: format!("{} ({})", event.name, event.email),
                    link: Some(format!("/leads/{}", event.lead_id)),
                },
                Dispatch::default(),
            )
            .await
            .map_err(enqueue_error)?;

        Ok(())
    }
}

/// Re-scores a lead on every status change; conversions additionally get a
/// high-priority CRM sync and a notification.
pub struct LeadStatusChangedHandler {
    leads: LeadJobs,
    notifications: NotificationJobs,
}

impl LeadStatusChangedHandler {
    pub fn new(leads: LeadJobs, notifications: NotificationJobs) -> Self {
        Self {
            leads,
            notifications,
        }
    }
}

#[async_trait]
impl EventHandler<LeadStatusChangedEvent> for LeadStatusChangedHandler {
    async fn handle(&self, event: &LeadStatusChangedEvent) -> Result<(), EventHandlerError> {
        self.leads
            .enqueue_scoring(
                ScoreLeadPayload {
                    lead_id: event.lead_id.clone(),
                    organization_id: event.organization_id.clone(),
                },
                Dispatch::default(),
            )
            .await
            .map_err(enqueue_error)?;

        if event.is_conversion() {
            self.leads
                .enqueue_crm_sync(
                    CrmSyncPayload {
                        lead_id: event.lead_id.clone(),
                        organization_id: event.organization_id.clone(),
                    },
                    Dispatch::default().with_priority(JobPriority::High),
                )
                .await
                .map_err(enqueue_error)?;

            self.notifications
                .create(
                    NotificationPayload {
                        organization_id: event.organization_id.clone(),
                        title: "Lead converted".to_string(),
                        body: format!(
                            "Lead {} moved from {} to {}",
                            event.lead_id, event.previous_status, event.new_status
                        ),
                        link: Some(format!("/leads/{}", event.lead_id)),
                    },
                    Dispatch::default(),
                )
                .await
                .map_err(enqueue_error)?;
        }

        Ok(())
    }
}

/// Raises an in-app notification for incoming form submissions.
pub struct SubmissionReceivedHandler {
    notifications: NotificationJobs,
}

impl SubmissionReceivedHandler {
    pub fn new(notifications: NotificationJobs) -> Self {
        Self { notifications }
    }
}

#[async_trait]
impl EventHandler<SubmissionReceivedEvent> for SubmissionReceivedHandler {
    async fn handle(&self, event: &SubmissionReceivedEvent) -> Result<(), EventHandlerError> {
        let body = match &event.email {
            Some(email) => format!("Submission from {}", email),
            None => "Anonymous submission".to_string(),
        };

        self.notifications
            .create(
                NotificationPayload {
                    organization_id: event.organization_id.clone(),
                    title: "New form submission".to_string(),
                    body,
                    link: Some(format!("/submissions/{}", event.submission_id)),
                },
                Dispatch::default(),
            )
            .await
            .map_err(enqueue_error)?;

        Ok(())
    }
}

/// Sends the welcome email to newly registered users.
pub struct UserRegisteredHandler {
    emails: EmailJobs,
}

impl UserRegisteredHandler {
    pub fn new(emails: EmailJobs) -> Self {
        Self { emails }
    }
}

#[async_trait]
impl EventHandler<UserRegisteredEvent> for UserRegisteredHandler {
    async fn handle(&self, event: &UserRegisteredEvent) -> Result<(), EventHandlerError> {
        self.emails
            .send_welcome(
                WelcomeEmailPayload {
                    user_id: event.user_id.clone(),
                    email: event.email.clone(),
                    name: event.name.clone(),
                },
                Dispatch::default(),
            )
            .await
            .map_err(enqueue_error)?;

        Ok(())
    }
}

/// Sends the invitation email to invited members.
pub struct MemberInvitedHandler {
    emails: EmailJobs,
}

impl MemberInvitedHandler {
    pub fn new(emails: EmailJobs) -> Self {
        Self { emails }
    }
}

#[async_trait]
impl EventHandler<MemberInvitedEvent> for MemberInvitedHandler {
    async fn handle(&self, event: &MemberInvitedEvent) -> Result<(), EventHandlerError> {
        self.emails
            .send_invite(
                InviteEmailPayload {
                    organization_id: event.organization_id.clone(),
                    invited_email: event.invited_email.clone(),
                    inviter_name: event.inviter_name.clone(),
                    role: event.role.clone(),
                },
                Dispatch::default(),
            )
            .await
            .map_err(enqueue_error)?;

        Ok(())
    }
}
