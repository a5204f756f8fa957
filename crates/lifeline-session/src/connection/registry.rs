//! Subscriber registry for inbound relay events.
//!
//! Lives outside the connection loop so subscriptions survive reconnects.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::types::{EventKind, RelayEvent};

/// Callback invoked on the connection loop task. Must not block.
pub type EventHandler = Arc<dyn Fn(&RelayEvent) + Send + Sync>;

/// Handle returned by `subscribe`, needed to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    next_id: AtomicU64,
    handlers: RwLock<Vec<(SubscriptionId, EventKind, EventHandler)>>,
}

impl SubscriberRegistry {
    pub(crate) fn subscribe(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind, handler));
        id
    }

    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        let before = handlers.len();
        handlers.retain(|(sub, _, _)| *sub != id);
        handlers.len() != before
    }

    /// Deliver an event to every matching handler, in subscription order.
    /// Returns the number of handlers called.
    pub(crate) fn dispatch(&self, event: &RelayEvent) -> usize {
        let kind = event.kind();
        // Snapshot first so handlers may (un)subscribe without deadlocking.
        let matching: Vec<EventHandler> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, h)| Arc::clone(h))
            .collect();
        for handler in &matching {
            handler(event);
        }
        matching.len()
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
