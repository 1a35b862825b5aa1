//! Queue names, job type enums and typed payloads.
//!
//! Each queue family has a closed set of job types; producers and workers
//! agree on the `as_str` discriminator, and payloads are typed structs
//! serialized into the job body.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Email queue name.
pub const EMAIL_QUEUE: &str = "email";
/// Notification queue name.
pub const NOTIFICATION_QUEUE: &str = "notification";
/// Lead processing queue name.
pub const LEAD_QUEUE: &str = "lead";

/// Job types on the email queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailJobType {
    SendWelcome,
    SendLeadAlert,
    SendInvite,
}

impl EmailJobType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SendWelcome => "send_welcome",
            Self::SendLeadAlert => "send_lead_alert",
            Self::SendInvite => "send_invite",
        }
    }
}

impl fmt::Display for EmailJobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job types on the notification queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationJobType {
    CreateNotification,
}

impl NotificationJobType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreateNotification => "create_notification",
        }
    }
}

impl fmt::Display for NotificationJobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Job types on the lead queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadJobType {
    EnrichLeadData,
    CalculateLeadScore,
    SyncToCrm,
}

impl LeadJobType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnrichLeadData => "enrich_lead_data",
            Self::CalculateLeadScore => "calculate_lead_score",
            Self::SyncToCrm => "sync_to_crm",
        }
    }
}

impl fmt::Display for LeadJobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload for [`EmailJobType::SendWelcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeEmailPayload {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

/// Payload for [`EmailJobType::SendLeadAlert`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadAlertPayload {
    pub lead_id: String,
    pub organization_id: String,
    pub recipient_email: String,
}

/// Payload for [`EmailJobType::SendInvite`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteEmailPayload {
    pub organization_id: String,
    pub invited_email: String,
    pub inviter_name: String,
    pub role: String,
}

/// Payload for [`NotificationJobType::CreateNotification`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub organization_id: String,
    pub title: String,
    pub body: String,
    pub link: Option<String>,
}

/// Payload for [`LeadJobType::EnrichLeadData`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichLeadPayload {
    pub lead_id: String,
    pub organization_id: String,
}

/// Payload for [`LeadJobType::CalculateLeadScore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLeadPayload {
    pub lead_id: String,
    pub organization_id: String,
}

/// Payload for [`LeadJobType::SyncToCrm`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmSyncPayload {
    pub lead_id: String,
    pub organization_id: String,
}
