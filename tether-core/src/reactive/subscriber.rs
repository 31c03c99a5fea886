//! Subscriber types for the reactive system.
//!
//! A Subscriber is any unit of recomputation that reads observed properties
//! and wants to hear about later writes: a render function, a watcher, a
//! cache invalidator. This crate only defines the seam; scheduling and
//! batching of the callbacks belong to the implementor.

use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a subscriber.
///
/// Registries key their subscriber sets by this ID, so registering the same
/// subscriber twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Something that can be notified when a dependency changes.
///
/// Registries only hold weak references to subscribers; keeping a subscriber
/// alive is the owner's job.
pub trait Subscriber: Send + Sync {
    /// Identity used for deduplication inside a registry.
    fn id(&self) -> SubscriberId;

    /// Called synchronously by [`Dep::notify`](super::Dep::notify).
    fn update(&self);
}
