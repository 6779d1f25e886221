//! Synchronous publish/subscribe event bus
//!
//! Subscribers for a given event fire strictly in subscription order and
//! complete before `publish` returns. Handlers are identified by id for
//! removal. Storage uses [`IndexMap`] for O(1) removal with stable insertion
//! order; handlers are cloned out of the registry before invocation, so a
//! handler may subscribe or unsubscribe without deadlocking the bus.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use super::args::{CancelOutcome, EventArgs};
use super::names;

/// Unique identifier for event handlers
pub type HandlerId = u64;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a new globally-unique handler id
fn next_handler_id() -> HandlerId {
    NEXT_HANDLER_ID.fetch_add(1, Ordering::SeqCst)
}

/// Handler invoked synchronously with the mutable event payload
pub type EventHandler = Arc<dyn Fn(&mut EventArgs) + Send + Sync>;

/// Synchronous publish/subscribe registry keyed by event name
#[derive(Default)]
pub struct EventBus {
    /// Per-event handler registries, insertion ordered
    registry: Mutex<HashMap<String, IndexMap<HandlerId, EventHandler>>>,

    /// Event names whose lazy registration hook has already run
    lazy_bound: Mutex<HashSet<String>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to an event; returns the id used to unsubscribe
    pub fn subscribe<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&mut EventArgs) + Send + Sync + 'static,
    {
        let id = next_handler_id();
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        self.registry
            .lock()
            .unwrap()
            .entry(event.to_string())
            .or_default()
            .insert(id, Arc::new(handler));
        trace!(event, id, "EventBus: handler subscribed");
        id
    }

    /// Subscribe with a one-time registration hook
    ///
    /// The hook runs exactly once per event name, on the first lazy
    /// subscription, regardless of how many local subscribers attach later.
    /// Used where a local subscription must be backed by an at-most-once
    /// remote callback registration.
    pub fn subscribe_lazy<H, F>(&self, event: &str, once_hook: H, handler: F) -> HandlerId
    where
        H: FnOnce(),
        F: Fn(&mut EventArgs) + Send + Sync + 'static,
    {
        let first = {
            // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
            let mut bound = self.lazy_bound.lock().unwrap();
            bound.insert(event.to_string())
        };
        if first {
            trace!(event, "EventBus: running one-time lazy registration hook");
            once_hook();
        }
        self.subscribe(event, handler)
    }

    /// Remove a handler by identity; unknown ids are ignored
    pub fn unsubscribe(&self, event: &str, id: HandlerId) {
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        let mut registry = self.registry.lock().unwrap();
        if let Some(handlers) = registry.get_mut(event) {
            handlers.shift_remove(&id);
            trace!(event, id, "EventBus: handler unsubscribed");
        }
    }

    /// Number of handlers currently subscribed to an event
    pub fn subscriber_count(&self, event: &str) -> usize {
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        self.registry
            .lock()
            .unwrap()
            .get(event)
            .map(IndexMap::len)
            .unwrap_or(0)
    }

    /// Publish an informational event; cancellation flags are ignored
    pub fn publish(&self, event: &str, args: &mut EventArgs) {
        self.run_handlers(event, args);
    }

    /// Publish a cancelable event and report the outcome
    ///
    /// After all subscribers have run, a cancelled-and-unhandled payload is
    /// republished as [`names::GLOBAL_CANCEL`] carrying the original event
    /// name, giving late subscribers one chance to mark it handled before
    /// the publisher fails the enclosing operation.
    pub fn publish_cancelable(&self, event: &str, args: &mut EventArgs) -> CancelOutcome {
        self.run_handlers(event, args);

        let mut outcome = CancelOutcome {
            cancelled: args.cancel,
            handled: args.handled,
        };

        if outcome.is_vetoed() && event != names::GLOBAL_CANCEL {
            let mut rescue = EventArgs::with_entry(
                names::KEY_SOURCE_EVENT,
                Value::String(event.to_string()),
            );
            rescue.cancel = true;
            self.run_handlers(names::GLOBAL_CANCEL, &mut rescue);
            if rescue.handled {
                trace!(event, "EventBus: cancellation handled by global-cancel subscriber");
                outcome.handled = true;
                args.handled = true;
            }
        }

        outcome
    }

    /// Invoke all handlers for an event, strictly in subscription order
    fn run_handlers(&self, event: &str, args: &mut EventArgs) {
        let handlers: Vec<EventHandler> = {
            // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
            let registry = self.registry.lock().unwrap();
            match registry.get(event) {
                Some(handlers) => handlers.values().cloned().collect(),
                None => return,
            }
        };

        args.event = event.to_string();
        trace!(event, count = handlers.len(), "EventBus: publishing");

        for handler in handlers {
            handler(args);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Intentional .unwrap() - poisoned mutex indicates serious bug, panic is appropriate
        let registry = self.registry.lock().unwrap();
        let counts: HashMap<&str, usize> = registry
            .iter()
            .map(|(name, handlers)| (name.as_str(), handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("subscribers", &counts).finish()
    }
}
