//! Per-plugin event delivery.
//!
//! An explicit observer registry: handlers subscribe to a named event and
//! dispatch delivers to all current handlers synchronously, in registration
//! order. There is no broadcast channel and no buffering; a handler sees the
//! event before the notification reply is sent.

use std::sync::{Arc, Mutex};

use bells_types::{EventName, PluginEvent};

type Handler = Arc<dyn Fn(&PluginEvent) + Send + Sync>;

struct Registered {
    id: u64,
    name: EventName,
    handler: Handler,
}

/// Handle returned by [`EventRouter::subscribe`]; pass it back to
/// [`EventRouter::unsubscribe`] to deregister.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
}

/// Fan-out registry for one plugin's events.
pub struct EventRouter {
    inner: Mutex<RouterInner>,
}

struct RouterInner {
    next_id: u64,
    handlers: Vec<Registered>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RouterInner { next_id: 1, handlers: Vec::new() }),
        }
    }

    /// Register a handler for `name`. Handlers fire in registration order.
    pub fn subscribe<F>(&self, name: EventName, handler: F) -> Subscription
    where
        F: Fn(&PluginEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().expect("event router lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push(Registered { id, name, handler: Arc::new(handler) });
        Subscription { id }
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        let mut inner = self.inner.lock().expect("event router lock poisoned");
        inner.handlers.retain(|h| h.id != subscription.id);
    }

    /// Deliver `event` to every handler registered under its name.
    ///
    /// Handlers are snapshotted under the lock and invoked outside it, so a
    /// handler may subscribe or unsubscribe without deadlocking.
    pub fn emit(&self, event: &PluginEvent) {
        let name = event.name();
        let matching: Vec<Handler> = {
            let inner = self.inner.lock().expect("event router lock poisoned");
            inner
                .handlers
                .iter()
                .filter(|h| h.name == name)
                .map(|h| h.handler.clone())
                .collect()
        };
        for handler in matching {
            handler(event);
        }
    }

    /// Number of handlers currently registered for `name`.
    pub fn handler_count(&self, name: EventName) -> usize {
        let inner = self.inner.lock().expect("event router lock poisoned");
        inner.handlers.iter().filter(|h| h.name == name).count()
    }
}

impl Default for EventRouter {
    fn default() -> Self {
        Self::new()
    }
}
