//! Registry of gameplay handlers that receive execution events.
//!
//! Handlers are the seam where concrete ability effects attach. The core
//! publishes an [`ExecutionEvent`] to the handlers registered for the
//! record's provider entity and for the record's event key; a handler marks
//! the event handled when it did something observable.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::action::ExecutionEvent;
use crate::state::{ActionWorld, EntityId, EventKey};

/// Receives execution events for the records it is registered against.
///
/// Handlers only read the world. They report their outcome through the event
/// (`handled`, `toggle`) and the engine applies the bookkeeping.
pub trait ActionHandler: Send + Sync {
    fn handle(&self, event: &mut ExecutionEvent, world: &ActionWorld);
}

impl<F> ActionHandler for F
where
    F: Fn(&mut ExecutionEvent, &ActionWorld) + Send + Sync,
{
    fn handle(&self, event: &mut ExecutionEvent, world: &ActionWorld) {
        self(event, world)
    }
}

/// Handlers keyed by provider entity and by event key.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    by_provider: BTreeMap<EntityId, Vec<Arc<dyn ActionHandler>>>,
    by_event: BTreeMap<EventKey, Vec<Arc<dyn ActionHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for events raised at `provider`.
    pub fn on_provider(&mut self, provider: EntityId, handler: Arc<dyn ActionHandler>) {
        self.by_provider.entry(provider).or_default().push(handler);
    }

    /// Registers a handler for every record whose event key is `key`.
    pub fn on_event(&mut self, key: impl Into<EventKey>, handler: Arc<dyn ActionHandler>) {
        self.by_event.entry(key.into()).or_default().push(handler);
    }

    /// Drops every handler registered for `provider` (entity destroyed).
    pub fn forget_provider(&mut self, provider: EntityId) {
        self.by_provider.remove(&provider);
    }

    pub fn is_empty(&self) -> bool {
        self.by_provider.is_empty() && self.by_event.is_empty()
    }

    /// Raises `event` at its provider, then at its event key subscribers.
    pub(crate) fn dispatch(&self, event: &mut ExecutionEvent, world: &ActionWorld) {
        let provider = self
            .by_provider
            .get(&event.provider)
            .into_iter()
            .flatten();
        let keyed = event
            .event
            .as_ref()
            .and_then(|key| self.by_event.get(key))
            .cloned()
            .into_iter()
            .flatten();

        for handler in provider.cloned().chain(keyed) {
            handler.handle(event, world);
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("providers", &self.by_provider.len())
            .field("events", &self.by_event.len())
            .finish()
    }
}
