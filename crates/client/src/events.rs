// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Typed publish/subscribe for cache changes.
//!
//! Three topic families exist:
//! - `<kind:id>`: a stored resource was written
//! - `invalidate:<kind:id>`: a resource or collection should be re-read,
//!   with a flag telling whether the remote has confirmed the change
//! - `syncing`: queue replay started or finished

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tally_core::Reference;
use tokio::sync::mpsc;
use tracing::debug;

/// A subscription key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Resource(Reference),
    Invalidate(Reference),
    Syncing,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Resource(reference) => write!(f, "{}", reference),
            Topic::Invalidate(reference) => write!(f, "invalidate:{}", reference),
            Topic::Syncing => write!(f, "syncing"),
        }
    }
}

/// A notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The resource was written to the store.
    Updated(Reference),
    /// The resource or collection is stale.
    Invalidated { reference: Reference, confirmed: bool },
    /// Queue replay started (`true`) or finished (`false`).
    Syncing(bool),
}

impl Event {
    /// The topic this event is delivered on.
    pub fn topic(&self) -> Topic {
        match self {
            Event::Updated(reference) => Topic::Resource(reference.clone()),
            Event::Invalidated { reference, .. } => Topic::Invalidate(reference.clone()),
            Event::Syncing(_) => Topic::Syncing,
        }
    }
}

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    listeners: Mutex<HashMap<Topic, Vec<(u64, Listener)>>>,
}

impl BusInner {
    fn lock(&self) -> MutexGuard<'_, HashMap<Topic, Vec<(u64, Listener)>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, topic: &Topic, id: u64) {
        let mut listeners = self.lock();
        if let Some(entries) = listeners.get_mut(topic) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                listeners.remove(topic);
            }
        }
    }
}

/// Fan-out of events to listeners keyed by topic.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `listener` for `topic`.
    ///
    /// The listener stays registered until the returned handle is dropped or
    /// [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, topic: Topic, listener: F) -> Subscription
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .lock()
            .entry(topic.clone())
            .or_default()
            .push((id, Arc::new(listener)));
        Subscription {
            bus: Some(Arc::downgrade(&self.inner)),
            topic,
            id,
        }
    }

    /// Registers a channel for `topic`, for consumers that prefer to await events.
    pub fn subscribe_channel(&self, topic: Topic) -> (Subscription, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.subscribe(topic, move |event| {
            // Receiver gone; the subscription will be dropped by its owner.
            let _ = tx.send(event.clone());
        });
        (subscription, rx)
    }

    /// Delivers `event` to every listener of its topic.
    ///
    /// Listeners run on the caller's thread after the registry lock is
    /// released, so a listener may subscribe or emit.
    pub fn emit(&self, event: Event) {
        let topic = event.topic();
        let listeners: Vec<Listener> = match self.inner.lock().get(&topic) {
            Some(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => Vec::new(),
        };
        debug!(topic = %topic, listeners = listeners.len(), "emit");
        for listener in listeners {
            listener(&event);
        }
    }

    /// Number of listeners registered for `topic`.
    pub fn listener_count(&self, topic: &Topic) -> usize {
        self.inner.lock().get(topic).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.inner.lock().len())
            .finish()
    }
}

/// Handle to a registered listener.
#[must_use = "dropping a subscription unsubscribes its listener"]
pub struct Subscription {
    bus: Option<Weak<BusInner>>,
    topic: Topic,
    id: u64,
}

impl Subscription {
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Removes the listener.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the listener registered for the life of the bus.
    pub fn detach(mut self) {
        self.bus = None;
    }

    fn release(&mut self) {
        if let Some(bus) = self.bus.take().and_then(|weak| weak.upgrade()) {
            bus.remove(&self.topic, self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
