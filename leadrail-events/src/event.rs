//! Event definitions and traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt::Debug;
use uuid::Uuid;

/// Cross-cutting context attached to an event at the call site.
///
/// Captures who/where a business fact came from without polluting the
/// per-type payload fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventContext {
    /// Acting user id, when the fact was triggered by a user.
    pub actor_id: Option<String>,

    /// Originating request IP.
    pub request_ip: Option<String>,

    /// Free-text reason (manual overrides, admin actions).
    pub reason: Option<String>,

    /// Additional free-form context.
    #[serde(default)]
    pub extra: serde_json::Value,
}

impl EventContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the acting user id.
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Set the originating request IP.
    pub fn with_request_ip(mut self, ip: impl Into<String>) -> Self {
        self.request_ip = Some(ip.into());
        self
    }

    /// Set a free-text reason.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Event metadata assigned at construction and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Unique event id. Used for tracing and dedup, not uniqueness-enforced.
    pub id: Uuid,

    /// Event name/type discriminator.
    pub name: String,

    /// When the fact occurred.
    pub timestamp: DateTime<Utc>,

    /// Cross-cutting context.
    #[serde(default)]
    pub context: EventContext,
}

impl EventMetadata {
    /// Create new event metadata.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            timestamp: Utc::now(),
            context: EventContext::default(),
        }
    }

    /// Attach context.
    pub fn with_context(mut self, context: EventContext) -> Self {
        self.context = context;
        self
    }
}

/// Event trait
///
/// All events must implement this trait to be published through the event bus.
pub trait Event: Send + Sync + Debug + 'static {
    /// Stable type discriminator (e.g. "lead.created").
    fn kind() -> &'static str
    where
        Self: Sized;

    /// Get event name
    fn event_name(&self) -> &str;

    /// Get event ID
    fn event_id(&self) -> Uuid;

    /// Get event timestamp
    fn timestamp(&self) -> DateTime<Utc>;

    /// Get the event context
    fn context(&self) -> &EventContext;

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// Event handler trait
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// Handle the event
    async fn handle(&self, event: &E) -> Result<(), EventHandlerError>;
}

/// Event handler error
#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Event processing error: {0}")]
    ProcessingError(String),
}

/// Type-erased event handler
#[async_trait]
pub trait DynEventHandler: Send + Sync {
    /// Handle event (type-erased)
    async fn handle_dyn(&self, event: &dyn Event) -> Result<(), EventHandlerError>;
}

/// Wrapper for typed event handlers
pub struct TypedEventHandler<E: Event, H: EventHandler<E>> {
    handler: H,
    _phantom: std::marker::PhantomData<fn() -> E>,
}

impl<E: Event, H: EventHandler<E>> TypedEventHandler<E, H> {
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            _phantom: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<E: Event, H: EventHandler<E>> DynEventHandler for TypedEventHandler<E, H> {
    async fn handle_dyn(&self, event: &dyn Event) -> Result<(), EventHandlerError> {
        if let Some(typed_event) = event.as_any().downcast_ref::<E>() {
            self.handler.handle(typed_event).await
        } else {
            Err(EventHandlerError::ProcessingError(format!(
                "event type mismatch for {}",
                event.event_name()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct TestEvent {
        metadata: EventMetadata,
        data: String,
    }

    impl TestEvent {
        fn new(data: String) -> Self {
            Self {
                metadata: EventMetadata::new(Self::kind()),
                data,
            }
        }
    }

    impl Event for TestEvent {
        fn kind() -> &'static str {
            "test.event"
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

    #[test]
    fn test_event_metadata() {
        let metadata = EventMetadata::new("test.event");

        assert_eq!(metadata.name, "test.event");
        assert!(metadata.context.actor_id.is_none());
    }

    #[test]
    fn test_event_metadata_with_context() {
        let context = EventContext::new()
            .with_actor("user-1")
            .with_request_ip("10.0.0.1")
            .with_reason("manual import");
        let metadata = EventMetadata::new("test.event").with_context(context);

        assert_eq!(metadata.context.actor_id.as_deref(), Some("user-1"));
        assert_eq!(metadata.context.request_ip.as_deref(), Some("10.0.0.1"));
        assert_eq!(metadata.context.reason.as_deref(), Some("manual import"));
    }

    #[test]
    fn test_event_ids_are_unique() {
        let a = TestEvent::new("a".to_string());
        let b = TestEvent::new("b".to_string());

        assert_ne!(a.event_id(), b.event_id());
        assert_eq!(a.event_name(), b.event_name());
        assert_eq!(a.data, "a");
    }
}
