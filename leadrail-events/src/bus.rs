//! Event Bus implementation

use crate::event::{DynEventHandler, Event, EventHandler, TypedEventHandler};
use dashmap::DashMap;
use futures::future::join_all;
use std::any::TypeId;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};
use uuid::Uuid;

/// Identifies a single handler registration on the bus.
pub type SubscriptionId = Uuid;

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Capacity of the bounded event history; oldest entries are evicted
    /// first on overflow.
    pub history_capacity: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1000,
        }
    }
}

struct TypeEntry {
    kind: &'static str,
    handlers: Vec<(SubscriptionId, Arc<dyn DynEventHandler>)>,
}

#[derive(Default)]
struct BusCounters {
    published: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Snapshot of bus activity for health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusStats {
    /// Event types with at least one registered handler.
    pub event_types: usize,
    /// Total registered handlers across all types.
    pub handlers: usize,
    /// Events published since construction.
    pub events_published: u64,
    /// Handler invocations that completed successfully.
    pub handlers_delivered: u64,
    /// Handler invocations that failed or panicked.
    pub handler_failures: u64,
    /// Current history length.
    pub history_len: usize,
}

/// In-process event bus for publishing domain events and fanning them out to
/// registered handlers.
///
/// Handlers for an event run concurrently with no ordering guarantee; a
/// failing or panicking handler never affects its siblings or the publisher.
/// `publish` resolves once every handler has settled.
#[derive(Clone)]
pub struct EventBus {
    /// Handlers registered for each event type
    handlers: Arc<DashMap<TypeId, TypeEntry>>,

    /// Bounded FIFO of recently published events, for debugging only
    history: Arc<Mutex<VecDeque<Arc<dyn Event>>>>,

    counters: Arc<BusCounters>,
    config: Arc<EventBusConfig>,
}

impl EventBus {
    /// Create new event bus
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create event bus with custom config
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            history: Arc::new(Mutex::new(VecDeque::with_capacity(
                config.history_capacity,
            ))),
            counters: Arc::new(BusCounters::default()),
            config: Arc::new(config),
        }
    }

    /// Subscribe a handler to an event type.
    ///
    /// Returns the id of this registration, which [`EventBus::unsubscribe`]
    /// accepts to remove exactly this handler.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let bus = EventBus::new();
    /// let id = bus.subscribe::<LeadCreatedEvent, _>(EnrichmentSubscriber::new(jobs));
    /// ```
    pub fn subscribe<E, H>(&self, handler: H) -> SubscriptionId
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let id = Uuid::new_v4();
        let handler: Arc<dyn DynEventHandler> = Arc::new(TypedEventHandler::new(handler));

        self.handlers
            .entry(TypeId::of::<E>())
            .or_insert_with(|| TypeEntry {
                kind: E::kind(),
                handlers: Vec::new(),
            })
            .handlers
            .push((id, handler));

        debug!(event = E::kind(), subscription = %id, "handler subscribed");
        id
    }

    /// Remove a single handler registration.
    ///
    /// Other handlers for the same event type stay registered. Returns false
    /// if the id was not registered for this event type.
    pub fn unsubscribe<E: Event>(&self, id: SubscriptionId) -> bool {
        let type_id = TypeId::of::<E>();
        let removed = {
            match self.handlers.get_mut(&type_id) {
                Some(mut entry) => {
                    let before = entry.handlers.len();
                    entry.handlers.retain(|(sid, _)| *sid != id);
                    entry.handlers.len() != before
                }
                None => false,
            }
        };
        self.handlers
            .remove_if(&type_id, |_, entry| entry.handlers.is_empty());

        if removed {
            debug!(event = E::kind(), subscription = %id, "handler unsubscribed");
        }
        removed
    }

    /// Unsubscribe all handlers for an event type
    pub fn unsubscribe_all<E: Event>(&self) {
        self.handlers.remove(&TypeId::of::<E>());
        debug!(event = E::kind(), "unsubscribed all handlers");
    }

    /// Clear all handlers for all event types
    pub fn clear(&self) {
        self.handlers.clear();
        info!("cleared all event handlers");
    }

    /// Publish an event.
    ///
    /// The event is appended to the bounded history, then every handler
    /// registered for its type is invoked concurrently. Handler errors and
    /// panics are caught, logged and counted; they are never surfaced to the
    /// publisher. Resolves only after all handlers have settled.
    pub async fn publish<E: Event>(&self, event: E) {
        let event: Arc<dyn Event> = Arc::new(event);
        self.record(Arc::clone(&event));
        self.counters.published.fetch_add(1, Ordering::Relaxed);

        info!(
            event = event.event_name(),
            event_id = %event.event_id(),
            "publishing event"
        );

        let handlers: Vec<Arc<dyn DynEventHandler>> = match self.handlers.get(&TypeId::of::<E>()) {
            Some(entry) => entry.handlers.iter().map(|(_, h)| Arc::clone(h)).collect(),
            None => {
                debug!(event = event.event_name(), "no handlers registered");
                return;
            }
        };

        let tasks: Vec<_> = handlers
            .into_iter()
            .map(|handler| {
                let event = Arc::clone(&event);
                tokio::spawn(async move { handler.handle_dyn(event.as_ref()).await })
            })
            .collect();

        for outcome in join_all(tasks).await {
            match outcome {
                Ok(Ok(())) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Ok(Err(e)) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        event = event.event_name(),
                        event_id = %event.event_id(),
                        error = %e,
                        "event handler failed"
                    );
                }
                Err(e) => {
                    self.counters.failed.fetch_add(1, Ordering::Relaxed);
                    error!(
                        event = event.event_name(),
                        event_id = %event.event_id(),
                        error = %e,
                        "event handler panicked"
                    );
                }
            }
        }
    }

    /// Get handler count for an event type
    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers
            .get(&TypeId::of::<E>())
            .map(|entry| entry.handlers.len())
            .unwrap_or(0)
    }

    /// Event types with at least one registered handler.
    pub fn registered_event_types(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|entry| entry.kind).collect()
    }

    /// Snapshot of recently published events, oldest first.
    pub fn history(&self) -> Vec<Arc<dyn Event>> {
        self.history.lock().unwrap().iter().cloned().collect()
    }

    /// Drop all retained history.
    pub fn clear_history(&self) {
        self.history.lock().unwrap().clear();
    }

    /// Current bus statistics.
    pub fn stats(&self) -> BusStats {
        BusStats {
            event_types: self.handlers.len(),
            handlers: self
                .handlers
                .iter()
                .map(|entry| entry.handlers.len())
                .sum(),
            events_published: self.counters.published.load(Ordering::Relaxed),
            handlers_delivered: self.counters.delivered.load(Ordering::Relaxed),
            handler_failures: self.counters.failed.load(Ordering::Relaxed),
            history_len: self.history.lock().unwrap().len(),
        }
    }

    fn record(&self, event: Arc<dyn Event>) {
        let mut history = self.history.lock().unwrap();
        if history.len() >= self.config.history_capacity {
            history.pop_front();
        }
        history.push_back(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventContext, EventHandlerError, EventMetadata};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::any::Any;
    use std::sync::atomic::AtomicU32;

    #[derive(Debug, Clone)]
    struct TestEvent {
        metadata: EventMetadata,
        message: String,
    }

    impl TestEvent {
        fn new(message: impl Into<String>) -> Self {
            Self {
                metadata: EventMetadata::new(Self::kind()),
                message: message.into(),
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

        fn timestamp(&self) -> chrono::DateTime<Utc> {
            self.metadata.timestamp
        }

        fn context(&self) -> &EventContext {
            &self.metadata.context
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug, Clone)]
    struct OtherEvent {
        metadata: EventMetadata,
    }

    impl OtherEvent {
        fn new() -> Self {
            Self {
                metadata: EventMetadata::new(Self::kind()),
            }
        }
    }

    impl Event for OtherEvent {
        fn kind() -> &'static str {
            "test.other"
        }

        fn event_name(&self) -> &str {
            &self.metadata.name
        }

        fn event_id(&self) -> Uuid {
            self.metadata.id
        }

        fn timestamp(&self) -> chrono::DateTime<Utc> {
            self.metadata.timestamp
        }

        fn context(&self) -> &EventContext {
            &self.metadata.context
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Clone)]
    struct CountingHandler {
        counter: Arc<AtomicU32>,
    }

    impl CountingHandler {
        fn new() -> Self {
            Self {
                counter: Arc::new(AtomicU32::new(0)),
            }
        }

        fn count(&self) -> u32 {
            self.counter.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EventHandler<TestEvent> for CountingHandler {
        async fn handle(&self, _event: &TestEvent) -> Result<(), EventHandlerError> {
            self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler<TestEvent> for FailingHandler {
        async fn handle(&self, _event: &TestEvent) -> Result<(), EventHandlerError> {
            Err(EventHandlerError::HandlerFailed("boom".to_string()))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl EventHandler<TestEvent> for PanickingHandler {
        async fn handle(&self, _event: &TestEvent) -> Result<(), EventHandlerError> {
            panic!("handler panic");
        }
    }

    struct NoopOtherHandler;

    #[async_trait]
    impl EventHandler<OtherEvent> for NoopOtherHandler {
        async fn handle(&self, _event: &OtherEvent) -> Result<(), EventHandlerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_publish_invokes_handler() {
        let bus = EventBus::new();
        let handler = CountingHandler::new();
        let handler_clone = handler.clone();

        bus.subscribe::<TestEvent, _>(handler);
        bus.publish(TestEvent::new("hello")).await;

        assert_eq!(handler_clone.count(), 1);
    }

    #[tokio::test]
    async fn test_publish_invokes_all_handlers_exactly_once() {
        let bus = EventBus::new();
        let h1 = CountingHandler::new();
        let h2 = CountingHandler::new();
        let c1 = h1.clone();
        let c2 = h2.clone();

        bus.subscribe::<TestEvent, _>(h1);
        bus.subscribe::<TestEvent, _>(h2);
        bus.publish(TestEvent::new("hello")).await;

        assert_eq!(c1.count(), 1);
        assert_eq!(c2.count(), 1);
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_affect_siblings() {
        let bus = EventBus::new();
        let counting = CountingHandler::new();
        let observer = counting.clone();

        bus.subscribe::<TestEvent, _>(FailingHandler);
        bus.subscribe::<TestEvent, _>(counting);
        bus.subscribe::<TestEvent, _>(PanickingHandler);

        bus.publish(TestEvent::new("hello")).await;

        assert_eq!(observer.count(), 1);
        let stats = bus.stats();
        assert_eq!(stats.handlers_delivered, 1);
        assert_eq!(stats.handler_failures, 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_only_target() {
        let bus = EventBus::new();
        let kept = CountingHandler::new();
        let removed = CountingHandler::new();
        let kept_observer = kept.clone();
        let removed_observer = removed.clone();

        bus.subscribe::<TestEvent, _>(kept);
        let id = bus.subscribe::<TestEvent, _>(removed);

        assert!(bus.unsubscribe::<TestEvent>(id));
        assert!(!bus.unsubscribe::<TestEvent>(id));
        assert_eq!(bus.handler_count::<TestEvent>(), 1);

        bus.publish(TestEvent::new("hello")).await;
        assert_eq!(kept_observer.count(), 1);
        assert_eq!(removed_observer.count(), 0);
    }

    #[tokio::test]
    async fn test_clear_removes_every_registration() {
        let bus = EventBus::new();
        bus.subscribe::<TestEvent, _>(CountingHandler::new());
        bus.subscribe::<TestEvent, _>(CountingHandler::new());
        bus.subscribe::<OtherEvent, _>(NoopOtherHandler);

        assert_eq!(bus.handler_count::<TestEvent>(), 2);
        assert_eq!(bus.handler_count::<OtherEvent>(), 1);
        assert_eq!(bus.registered_event_types().len(), 2);

        bus.clear();
        assert_eq!(bus.handler_count::<TestEvent>(), 0);
        assert_eq!(bus.handler_count::<OtherEvent>(), 0);
        assert!(bus.registered_event_types().is_empty());
    }

    #[tokio::test]
    async fn test_unsubscribe_all_clears_one_type() {
        let bus = EventBus::new();
        bus.subscribe::<TestEvent, _>(CountingHandler::new());

        bus.unsubscribe_all::<TestEvent>();
        assert_eq!(bus.handler_count::<TestEvent>(), 0);
    }

    #[tokio::test]
    async fn test_publish_without_handlers_is_noop() {
        let bus = EventBus::new();
        bus.publish(OtherEvent::new()).await;

        assert_eq!(bus.stats().events_published, 1);
        assert_eq!(bus.stats().handlers_delivered, 0);
    }

    #[tokio::test]
    async fn test_history_evicts_oldest_first() {
        let bus = EventBus::with_config(EventBusConfig {
            history_capacity: 5,
        });

        let mut ids = Vec::new();
        for i in 0..8 {
            let event = TestEvent::new(format!("event-{i}"));
            ids.push(event.event_id());
            bus.publish(event).await;
        }

        let history = bus.history();
        assert_eq!(history.len(), 5);

        let retained: Vec<Uuid> = history.iter().map(|e| e.event_id()).collect();
        for evicted in &ids[..3] {
            assert!(!retained.contains(evicted));
        }
        assert_eq!(retained, ids[3..].to_vec());
    }

    #[tokio::test]
    async fn test_clear_history() {
        let bus = EventBus::new();
        bus.publish(TestEvent::new("hello")).await;
        assert_eq!(bus.history().len(), 1);

        bus.clear_history();
        assert!(bus.history().is_empty());
        // counters survive a history clear
        assert_eq!(bus.stats().events_published, 1);
    }

    #[tokio::test]
    async fn test_history_retains_payload() {
        let bus = EventBus::new();
        bus.publish(TestEvent::new("hello")).await;

        let history = bus.history();
        let event = history[0]
            .as_any()
            .downcast_ref::<TestEvent>()
            .expect("test event in history");
        assert_eq!(event.message, "hello");
    }
}
