//! Typed domain events.
//!
//! One constructor per business fact; required fields are enforced by the
//! type system, so a malformed payload is unrepresentable. Construction
//! performs no I/O.

use crate::lead::{LeadSource, LeadStatus};
use chrono::{DateTime, Utc};
use leadrail_events::{Event, EventContext, EventMetadata};
use std::any::Any;
use uuid::Uuid;

macro_rules! impl_event {
    ($event:ty, $kind:literal) => {
        impl Event for $event {
            fn kind() -> &'static str {
                $kind
            }

            fn event_name(&self) -> &str {
                &self.metadata.name
            }

            fn event_id(&self) -> Uuid {
                self.metadata.id
            }

            fn timestamp(&self) -> DateTime<Utc> {
                self.metadata.timestamp
            }

            fn context(&self) -> &EventContext {
                &self.metadata.context
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        impl $event {
            /// Attach cross-cutting context (acting user, request ip, reason).
            pub fn with_context(mut self, context: EventContext) -> Self {
                self.metadata = self.metadata.with_context(context);
                self
            }
        }
    };
}

/// A new lead entered the system.
#[derive(Debug, Clone)]
pub struct LeadCreatedEvent {
    pub metadata: EventMetadata,
    pub lead_id: String,
    pub organization_id: String,
    pub name: String,
    pub email: String,
    pub status: LeadStatus,
    pub source: LeadSource,
}

impl LeadCreatedEvent {
    pub fn new(
        lead_id: impl Into<String>,
        organization_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        status: LeadStatus,
        source: LeadSource,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(Self::kind()),
            lead_id: lead_id.into(),
            organization_id: organization_id.into(),
            name: name.into(),
            email: email.into(),
            status,
            source,
        }
    }
}

impl_event!(LeadCreatedEvent, "lead.created");

/// A lead moved between funnel statuses.
#[derive(Debug, Clone)]
pub struct LeadStatusChangedEvent {
    pub metadata: EventMetadata,
    pub lead_id: String,
    pub organization_id: String,
    pub previous_status: LeadStatus,
    pub new_status: LeadStatus,
}

impl LeadStatusChangedEvent {
    pub fn new(
        lead_id: impl Into<String>,
        organization_id: impl Into<String>,
        previous_status: LeadStatus,
        new_status: LeadStatus,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(Self::kind()),
            lead_id: lead_id.into(),
            organization_id: organization_id.into(),
            previous_status,
            new_status,
        }
    }

    /// Whether this change is a conversion. Derived from the payload,
    /// never stored separately.
    pub fn is_conversion(&self) -> bool {
        self.new_status == LeadStatus::Converted && self.previous_status != LeadStatus::Converted
    }
}

impl_event!(LeadStatusChangedEvent, "lead.status_changed");

/// A lead was removed.
#[derive(Debug, Clone)]
pub struct LeadDeletedEvent {
    pub metadata: EventMetadata,
    pub lead_id: String,
    pub organization_id: String,
}

impl LeadDeletedEvent {
    pub fn new(lead_id: impl Into<String>, organization_id: impl Into<String>) -> Self {
        Self {
            metadata: EventMetadata::new(Self::kind()),
            lead_id: lead_id.into(),
            organization_id: organization_id.into(),
        }
    }
}

impl_event!(LeadDeletedEvent, "lead.deleted");

/// A public form submission arrived.
#[derive(Debug, Clone)]
pub struct SubmissionReceivedEvent {
    pub metadata: EventMetadata,
    pub submission_id: String,
    pub form_id: String,
    pub organization_id: String,
    pub email: Option<String>,
    pub fields: serde_json::Value,
}

impl SubmissionReceivedEvent {
    pub fn new(
        submission_id: impl Into<String>,
        form_id: impl Into<String>,
        organization_id: impl Into<String>,
        email: Option<String>,
        fields: serde_json::Value,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(Self::kind()),
            submission_id: submission_id.into(),
            form_id: form_id.into(),
            organization_id: organization_id.into(),
            email,
            fields,
        }
    }
}

impl_event!(SubmissionReceivedEvent, "submission.received");

/// A user completed registration.
#[derive(Debug, Clone)]
pub struct UserRegisteredEvent {
    pub metadata: EventMetadata,
    pub user_id: String,
    pub organization_id: String,
    pub email: String,
    pub name: String,
}

impl UserRegisteredEvent {
    pub fn new(
        user_id: impl Into<String>,
        organization_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(Self::kind()),
            user_id: user_id.into(),
            organization_id: organization_id.into(),
            email: email.into(),
            name: name.into(),
        }
    }
}

impl_event!(UserRegisteredEvent, "user.registered");

/// An organization member was invited.
#[derive(Debug, Clone)]
pub struct MemberInvitedEvent {
    pub metadata: EventMetadata,
    pub organization_id: String,
    pub invited_email: String,
    pub inviter_name: String,
    pub role: String,
}

impl MemberInvitedEvent {
    pub fn new(
        organization_id: impl Into<String>,
        invited_email: impl Into<String>,
        inviter_name: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EventMetadata::new(Self::kind()),
            organization_id: organization_id.into(),
            invited_email: invited_email.into(),
            inviter_name: inviter_name.into(),
            role: role.into(),
        }
    }
}

impl_event!(MemberInvitedEvent, "member.invited");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lead_created_event() {
        let event = LeadCreatedEvent::new(
            "l1",
            "o1",
            "Jane",
            "jane@x.com",
            LeadStatus::New,
            LeadSource::Website,
        );

        assert_eq!(event.event_name(), "lead.created");
        assert_eq!(event.lead_id, "l1");
        assert_eq!(event.status, LeadStatus::New);
    }

    #[test]
    fn test_is_conversion() {
        let converted =
            LeadStatusChangedEvent::new("l1", "o1", LeadStatus::Qualified, LeadStatus::Converted);
        assert!(converted.is_conversion());

        let regressed =
            LeadStatusChangedEvent::new("l1", "o1", LeadStatus::Converted, LeadStatus::Lost);
        assert!(!regressed.is_conversion());

        let unchanged =
            LeadStatusChangedEvent::new("l1", "o1", LeadStatus::Converted, LeadStatus::Converted);
        assert!(!unchanged.is_conversion());
    }

    #[test]
    fn test_event_context_attachment() {
        let event = LeadDeletedEvent::new("l1", "o1").with_context(
            EventContext::new()
                .with_actor("user-9")
                .with_reason("duplicate entry"),
        );

        assert_eq!(event.context().actor_id.as_deref(), Some("user-9"));
        assert_eq!(event.context().reason.as_deref(), Some("duplicate entry"));
    }

    #[test]
    fn test_kind_is_stable_per_type() {
        assert_eq!(LeadCreatedEvent::kind(), "lead.created");
        assert_eq!(LeadStatusChangedEvent::kind(), "lead.status_changed");
        assert_eq!(SubmissionReceivedEvent::kind(), "submission.received");
        assert_eq!(UserRegisteredEvent::kind(), "user.registered");
        assert_eq!(MemberInvitedEvent::kind(), "member.invited");
    }
}
