//! In-process domain event bus for Leadrail
//!
//! This crate decouples producers of business facts from their side effects.
//! An application action constructs a typed event and publishes it on the
//! [`EventBus`]; every handler registered for that event type runs
//! concurrently, and a failing handler never affects its siblings or the
//! publisher.
//!
//! Delivery is best-effort fan-out: the bus guarantees a delivery *attempt*
//! to every registered handler, not delivery success. Anything that must
//! eventually happen (sending an email, syncing a CRM) belongs on the job
//! queue, enqueued from inside a handler.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use leadrail_events::*;
//! use async_trait::async_trait;
//!
//! #[derive(Debug, Clone)]
//! struct UserRegisteredEvent {
//!     metadata: EventMetadata,
//!     user_id: String,
//!     email: String,
//! }
//!
//! impl Event for UserRegisteredEvent {
//!     fn kind() -> &'static str { "user.registered" }
//!     fn event_name(&self) -> &str { &self.metadata.name }
//!     fn event_id(&self) -> Uuid { self.metadata.id }
//!     fn timestamp(&self) -> DateTime<Utc> { self.metadata.timestamp }
//!     fn context(&self) -> &EventContext { &self.metadata.context }
//!     fn as_any(&self) -> &dyn Any { self }
//! }
//!
//! struct WelcomeEmailSubscriber;
//!
//! #[async_trait]
//! impl EventHandler<UserRegisteredEvent> for WelcomeEmailSubscriber {
//!     async fn handle(&self, event: &UserRegisteredEvent) -> Result<(), EventHandlerError> {
//!         // enqueue a welcome email job here
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() {
//! let bus = EventBus::new();
//! bus.subscribe::<UserRegisteredEvent, _>(WelcomeEmailSubscriber);
//! bus.publish(UserRegisteredEvent { /* ... */ }).await;
//! # }
//! ```
//!
//! ## Introspection
//!
//! The bus keeps a bounded FIFO history of published events (default 1000,
//! oldest evicted first) plus counters exposed through [`EventBus::stats`];
//! both exist for debugging and health checks, never for replay.

pub mod bus;
pub mod event;

pub use bus::{BusStats, EventBus, EventBusConfig, SubscriptionId};
pub use event::{
    DynEventHandler, Event, EventContext, EventHandler, EventHandlerError, EventMetadata,
    TypedEventHandler,
};
