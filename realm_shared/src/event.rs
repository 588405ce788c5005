//! World event hub.
//!
//! The hub is the client's view of the network: transport tasks publish
//! decoded [`WorldEvent`]s into it, and consumers hold a [`Subscription`]
//! handle for as long as they want to receive them. Dropping or releasing the
//! handle deregisters it.
//!
//! A hub starts *not ready*. The transport marks it ready once a connection
//! exists; consumers wait for that before subscribing.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
};

use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::WorldEvent;

#[derive(Default)]
struct HubInner {
    ready: bool,
    closed: bool,
    next_id: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<WorldEvent>>,
}

/// Cloneable fan-out of world events.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Marks the hub as able to deliver events.
    pub fn mark_ready(&self) {
        self.lock().ready = true;
    }

    pub fn is_ready(&self) -> bool {
        let inner = self.lock();
        inner.ready && !inner.closed
    }

    /// Registers a new subscriber.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        if !inner.closed {
            inner.subscribers.insert(id, tx);
        }
        debug!(subscription = id, "Subscribed to world events");
        Subscription {
            id,
            rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers an event to every live subscriber, in publish order.
    /// Returns how many subscribers received it.
    pub fn publish(&self, event: WorldEvent) -> usize {
        let mut inner = self.lock();
        inner
            .subscribers
            .retain(|_, tx| tx.send(event.clone()).is_ok());
        inner.subscribers.len()
    }

    /// Ends the stream: current subscribers drain what is queued and then
    /// see `None`.
    pub fn close(&self) {
        let mut inner = self.lock();
        inner.closed = true;
        inner.subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }
}

/// Registration handle returned by [`EventHub::subscribe`].
pub struct Subscription {
    id: u64,
    rx: mpsc::UnboundedReceiver<WorldEvent>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    /// Waits for the next event. `None` once the hub is closed or gone and
    /// the queue is drained.
    pub async fn recv(&mut self) -> Option<WorldEvent> {
        self.rx.recv().await
    }

    /// Returns a queued event without waiting.
    pub fn try_recv(&mut self) -> Option<WorldEvent> {
        self.rx.try_recv().ok()
    }

    /// Deregisters from the hub.
    pub fn release(self) {}

    fn detach(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let mut inner = hub.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.subscribers.remove(&self.id).is_some() {
                debug!(subscription = self.id, "Released world event subscription");
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.detach();
    }
}
