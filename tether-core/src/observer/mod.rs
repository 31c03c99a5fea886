//! Observation
//!
//! [`observe`] turns a plain data tree into an instrumented one, in place:
//!
//! - every own key of every object becomes a [`ReactiveProperty`] with its
//!   own registry;
//! - every array's mutators start notifying the array's registry;
//! - nested objects and arrays are observed eagerly, before any read can
//!   happen.
//!
//! Eager observation costs time proportional to the size of the structure at
//! attach time. That is the price of never having a read slip through
//! unobserved, and it is paid once per node.
//!
//! # Markers
//!
//! Each observed node is owned by exactly one [`Observer`]. The link lives in
//! a process-wide side table keyed by [`NodeId`], not on the node itself, so
//! observation never changes what a node enumerates or serializes. The entry
//! is inserted before the node's children are visited (cyclic structures
//! terminate) and removed when the node is dropped.

mod array;
mod property;

use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::config;
use crate::reactive::Dep;
use crate::value::{Array, NodeId, Object, Slot, Value};

pub use array::ArrayMethod;
pub(crate) use array::intercept;
pub use property::{define_reactive, ReactiveProperty};

static OBSERVERS: OnceLock<DashMap<NodeId, Arc<Observer>>> = OnceLock::new();

fn registry() -> &'static DashMap<NodeId, Arc<Observer>> {
    OBSERVERS.get_or_init(DashMap::new)
}

/// Drop the marker for a node that no longer exists.
pub(crate) fn forget(id: NodeId) {
    if let Some(observers) = OBSERVERS.get() {
        observers.remove(&id);
    }
}

pub(crate) fn observer_for(id: NodeId) -> Option<Arc<Observer>> {
    registry().get(&id).map(|entry| Arc::clone(entry.value()))
}

/// The Observer owning `value`, if it has been observed.
pub fn observer_of(value: &Value) -> Option<Arc<Observer>> {
    value.node_id().and_then(observer_for)
}

/// Whether `value` has been observed.
pub fn is_observed(value: &Value) -> bool {
    value
        .node_id()
        .is_some_and(|id| registry().contains_key(&id))
}

/// Observe `value` in place.
///
/// Returns the new Observer, or `None` when there was nothing to do:
/// `value` is not an object or array, it is already observed, it was marked
/// raw, or observation is switched off on this thread.
pub fn observe(value: &Value) -> Option<Arc<Observer>> {
    let id = value.node_id()?;

    if registry().contains_key(&id) {
        return None;
    }
    if !config::should_observe() || value.is_raw() {
        tracing::trace!(node = id.raw(), "observation skipped");
        return None;
    }

    Observer::attach(value, id)
}

/// Which path an Observer took when it was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservedKind {
    Object,
    Array,
}

/// Owner of one observed node.
///
/// Besides the marker relationship, an Observer carries the node's own
/// registry. Array mutators notify it, and reactive properties holding the
/// node register their readers on it too.
#[derive(Debug)]
pub struct Observer {
    node: NodeId,
    kind: ObservedKind,
    dep: Arc<Dep>,
}

impl Observer {
    fn attach(value: &Value, id: NodeId) -> Option<Arc<Self>> {
        let kind = match value {
            Value::Array(_) => ObservedKind::Array,
            _ => ObservedKind::Object,
        };
        let observer = Arc::new(Self {
            node: id,
            kind,
            dep: Arc::new(Dep::new()),
        });

        // Marker first, so anything reachable from here back to this node
        // sees it as observed.
        match registry().entry(id) {
            Entry::Occupied(_) => return None,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&observer));
            }
        }

        tracing::debug!(node = id.raw(), kind = ?kind, "observer attached");

        match value {
            Value::Array(array) => Self::observe_array(array),
            Value::Object(object) => Self::walk(object),
            _ => {}
        }

        Some(observer)
    }

    /// Convert every plain own key of `object` into a reactive property.
    pub fn walk(object: &Object) {
        for (key, slot) in object.slots() {
            if let Slot::Data(value) = slot {
                define_reactive(object, key, value);
            }
        }
    }

    /// Observe every element of `array`. Primitives are skipped by
    /// [`observe`] itself.
    pub fn observe_array(array: &Array) {
        for item in array.to_vec() {
            observe(&item);
        }
    }

    /// Identity of the node this Observer owns.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn kind(&self) -> ObservedKind {
        self.kind
    }

    /// The node's own registry.
    pub fn dep(&self) -> &Arc<Dep> {
        &self.dep
    }

    /// Notify everyone registered on the node's own registry.
    pub fn notify(&self) {
        self.dep.notify();
    }
}
