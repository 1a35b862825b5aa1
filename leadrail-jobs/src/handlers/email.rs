//! Email job handlers.

use super::parse_payload;
use crate::types::{InviteEmailPayload, LeadAlertPayload, WelcomeEmailPayload};
use async_trait::async_trait;
use leadrail_queue::{Job, QueueError, QueueResult};
use thiserror::Error;
use tracing::info;

/// Outbound email message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Email provider errors.
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Email provider error: {0}")]
    Provider(String),
}

/// Seam to the email provider. The production implementation talks to the
/// actual transport; failures must propagate so the job is retried.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// Stub sender that logs instead of calling a provider.
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), EmailError> {
        info!(to = %message.to, subject = %message.subject, "sending email");
        Ok(())
    }
}

pub async fn handle_send_welcome(sender: &dyn EmailSender, job: &Job) -> QueueResult<()> {
    let payload: WelcomeEmailPayload = parse_payload(job)?;

    let message = EmailMessage {
        to: payload.email,
        subject: "Welcome to Leadrail".to_string(),
        body: format!(
            "Hi {}, your workspace is ready. Head to your dashboard to capture your first lead.",
            payload.name
        ),
    };

    sender
        .send(&message)
        .await
        .map_err(|e| QueueError::ExecutionFailed(e.to_string()))
}

pub async fn handle_send_lead_alert(sender: &dyn EmailSender, job: &Job) -> QueueResult<()> {
    let payload: LeadAlertPayload = parse_payload(job)?;

    let message = EmailMessage {
        to: payload.recipient_email,
        subject: "A new lead is waiting".to_string(),
        body: format!("Lead {} just came in. View it at /leads/{}.", payload.lead_id, payload.lead_id),
    };

    sender
        .send(&message)
        .await
        .map_err(|e| QueueError::ExecutionFailed(e.to_string()))
}

pub async fn handle_send_invite(sender: &dyn EmailSender, job: &Job) -> QueueResult<()> {
    let payload: InviteEmailPayload = parse_payload(job)?;

    let message = EmailMessage {
        to: payload.invited_email,
        subject: format!("{} invited you to their Leadrail workspace", payload.inviter_name),
        body: format!(
            "You have been invited as {}. Accept the invite to join the workspace.",
            payload.role
        ),
    };

    sender
        .send(&message)
        .await
        .map_err(|e| QueueError::ExecutionFailed(e.to_string()))
}
