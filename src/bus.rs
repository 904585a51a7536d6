//! In-process publish/subscribe over [`Event`]s.
//!
//! Subscriptions are keyed by [`EventKind`] and invoked in registration
//! order. Three modes compose: persistent (fires until unsubscribed),
//! once (removed after its first firing), and filtered (a predicate
//! gates the handler; a non-matching event does not count as a firing,
//! so a filtered once-subscription survives mismatches).
//!
//! Dispatch discipline:
//! - A handler that emits another event causes an inline, depth-first
//!   dispatch; the inner event is fully processed before the outer
//!   dispatch resumes. A subscription never observes an event emitted
//!   from inside its own handler.
//! - Subscriptions registered during a dispatch first observe the next
//!   event.
//! - A panicking handler is logged, removed, and does not disturb the
//!   remaining subscribers.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError};

use tracing::error;

use crate::event::{Event, EventKind};

/// Handle returned by the subscribe methods, used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&Event) + Send>;
type Filter = Box<dyn Fn(&Event) -> bool + Send>;

struct Subscription {
    once: bool,
    filter: Option<Filter>,
    handler: Handler,
}

enum Slot {
    Occupied(Subscription),
    /// Taken out for invocation; `true` marks an unsubscribe that
    /// arrived while the handler was running.
    Running(bool),
    Vacant,
}

struct Entry {
    id: u64,
    kind: EventKind,
    slot: Slot,
}

#[derive(Default)]
struct Inner {
    entries: Vec<Entry>,
    next_id: u64,
}

impl Inner {
    fn entry_mut(&mut self, id: u64) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

/// The engine's event bus.
#[derive(Default)]
pub struct EventBus {
    inner: Mutex<Inner>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add(&self, kind: EventKind, once: bool, filter: Option<Filter>, handler: Handler) -> SubscriptionId {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.push(Entry {
            id,
            kind,
            slot: Slot::Occupied(Subscription {
                once,
                filter,
                handler,
            }),
        });
        SubscriptionId(id)
    }

    /// Subscribe to every event of `kind` until unsubscribed.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.add(kind, false, None, Box::new(handler))
    }

    /// Subscribe to the next event of `kind`, then unsubscribe.
    pub fn subscribe_once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&Event) + Send + 'static,
    {
        self.add(kind, true, None, Box::new(handler))
    }

    /// Persistent subscription gated by a predicate.
    pub fn subscribe_filtered<P, F>(&self, kind: EventKind, filter: P, handler: F) -> SubscriptionId
    where
        P: Fn(&Event) -> bool + Send + 'static,
        F: FnMut(&Event) + Send + 'static,
    {
        self.add(kind, false, Some(Box::new(filter)), Box::new(handler))
    }

    /// One-shot subscription gated by a predicate. Events failing the
    /// predicate do not consume the subscription.
    pub fn subscribe_once_filtered<P, F>(
        &self,
        kind: EventKind,
        filter: P,
        handler: F,
    ) -> SubscriptionId
    where
        P: Fn(&Event) -> bool + Send + 'static,
        F: FnMut(&Event) + Send + 'static,
    {
        self.add(kind, true, Some(Box::new(filter)), Box::new(handler))
    }

    /// Remove a subscription. Safe to call from inside a handler.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entry_mut(id.0) {
            match entry.slot {
                Slot::Running(ref mut cancelled) => *cancelled = true,
                _ => entry.slot = Slot::Vacant,
            }
        }
    }

    /// Deliver an event to every matching subscription, in registration
    /// order as of the start of this dispatch.
    pub fn dispatch(&self, event: &Event) {
        let kind = event.kind();
        let ids: Vec<u64> = {
            let inner = self.lock();
            inner
                .entries
                .iter()
                .filter(|e| e.kind == kind && matches!(e.slot, Slot::Occupied(_)))
                .map(|e| e.id)
                .collect()
        };

        for id in ids {
            let taken = {
                let mut inner = self.lock();
                match inner.entry_mut(id) {
                    Some(entry) if matches!(entry.slot, Slot::Occupied(_)) => {
                        match std::mem::replace(&mut entry.slot, Slot::Running(false)) {
                            Slot::Occupied(sub) => Some(sub),
                            _ => None,
                        }
                    }
                    _ => None,
                }
            };
            let Some(mut sub) = taken else { continue };

            let matched = sub.filter.as_ref().map_or(true, |f| f(event));
            let mut panicked = false;
            if matched && catch_unwind(AssertUnwindSafe(|| (sub.handler)(event))).is_err() {
                error!(kind = ?kind, "event subscriber panicked; removing it");
                panicked = true;
            }
            let consumed = panicked || (matched && sub.once);

            let mut inner = self.lock();
            if let Some(entry) = inner.entry_mut(id) {
                let cancelled = matches!(entry.slot, Slot::Running(true));
                entry.slot = if consumed || cancelled {
                    Slot::Vacant
                } else {
                    Slot::Occupied(sub)
                };
            }
        }

        // Compact once no dispatch (including re-entrant ones) is active.
        let mut inner = self.lock();
        if !inner
            .entries
            .iter()
            .any(|e| matches!(e.slot, Slot::Running(_)))
        {
            inner.entries.retain(|e| !matches!(e.slot, Slot::Vacant));
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("EventBus")
            .field("subscriptions", &inner.entries.len())
            .finish()
    }
}
