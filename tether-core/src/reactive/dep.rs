//! Dependency Registry
//!
//! A `Dep` is the set of subscribers interested in one observed property
//! (or in one observed node's structural changes). Reads record the active
//! subscriber, writes fan a notification out to everyone recorded.
//!
//! # Ordering and re-entrancy
//!
//! Subscribers are kept in registration order and deduplicated by
//! [`SubscriberId`]. [`Dep::notify`] snapshots the live subscribers and
//! releases the lock before calling any of them, so a subscriber may freely
//! read or write the same property from inside `update()`:
//!
//! - subscribers registered during a pass are first called on the next pass;
//! - a subscriber removed during a pass may still receive that pass's call.
//!
//! A panicking subscriber aborts the rest of the pass.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId};

/// Unique identifier for a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DepId(u64);

impl DepId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A per-property set of subscribers.
pub struct Dep {
    id: DepId,
    /// Weak references only: a registry never keeps a subscriber alive.
    subscribers: Mutex<IndexMap<SubscriberId, Weak<dyn Subscriber>>>,
}

impl Dep {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            id: DepId::next(),
            subscribers: Mutex::new(IndexMap::new()),
        }
    }

    /// Get the registry's unique ID.
    pub fn id(&self) -> DepId {
        self.id
    }

    /// Register the active subscriber, if there is one.
    ///
    /// Outside any tracked evaluation this does nothing.
    pub fn depend(self: &Arc<Self>) {
        let Some(subscriber) = ReactiveContext::current() else {
            return;
        };

        if self.add_subscriber(&subscriber) {
            tracing::trace!(
                dep = self.id.0,
                subscriber = subscriber.id().raw(),
                "dependency recorded"
            );
        }
        ReactiveContext::track_dependency(self);
    }

    /// Add `subscriber` to the set.
    ///
    /// Returns `false` if it was already registered.
    pub fn add_subscriber(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        let mut subscribers = self.subscribers.lock();
        let id = subscriber.id();
        if subscribers.contains_key(&id) {
            return false;
        }
        // Registries read often but written rarely would otherwise keep
        // dead entries until the next notify.
        subscribers.retain(|_, weak| weak.strong_count() > 0);
        subscribers.insert(id, Arc::downgrade(subscriber));
        true
    }

    /// Remove a subscriber. Returns `true` if it was registered.
    pub fn remove_subscriber(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().shift_remove(&id).is_some()
    }

    /// Synchronously call `update()` on every live subscriber, in
    /// registration order.
    pub fn notify(&self) {
        let live: SmallVec<[Arc<dyn Subscriber>; 4]> = {
            let mut subscribers = self.subscribers.lock();
            subscribers.retain(|_, weak| weak.strong_count() > 0);
            subscribers.values().filter_map(Weak::upgrade).collect()
        };

        tracing::trace!(dep = self.id.0, subscribers = live.len(), "notify");

        for subscriber in live {
            subscriber.update();
        }
    }

    /// Check whether a subscriber is registered.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Registered subscriber IDs, in registration order.
    pub fn subscriber_ids(&self) -> Vec<SubscriberId> {
        self.subscribers.lock().keys().copied().collect()
    }

    /// Get the number of registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep")
            .field("id", &self.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
