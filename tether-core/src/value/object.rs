//! Object Nodes
//!
//! An object is an insertion-ordered map from string keys to slots. A slot
//! is either plain data or, once the object has been observed, a
//! [`ReactiveProperty`] that tracks reads and notifies on writes. Callers
//! never see the difference: `get` and `set` route through whatever the slot
//! holds.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{NodeId, Value};
use crate::observer::{self, ReactiveProperty};

/// Storage behind one key.
#[derive(Clone)]
pub(crate) enum Slot {
    Data(Value),
    Reactive(Arc<ReactiveProperty>),
}

struct ObjectNode {
    id: NodeId,
    raw: AtomicBool,
    slots: RwLock<IndexMap<Arc<str>, Slot>>,
}

impl Drop for ObjectNode {
    fn drop(&mut self) {
        observer::forget(self.id);
    }
}

/// Shared handle to an object node.
///
/// Cloning the handle does not copy the object; both handles see the same
/// keys and the same observation state.
#[derive(Clone)]
pub struct Object {
    node: Arc<ObjectNode>,
}

impl Object {
    /// Create an empty object.
    pub fn new() -> Self {
        Self {
            node: Arc::new(ObjectNode {
                id: NodeId::new(),
                raw: AtomicBool::new(false),
                slots: RwLock::new(IndexMap::new()),
            }),
        }
    }

    /// Get the node's identity.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Check whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// Read a property.
    ///
    /// For reactive properties this records the active subscriber, if any.
    pub fn get(&self, key: &str) -> Option<Value> {
        let slot = self.node.slots.read().get(key).cloned()?;
        Some(match slot {
            Slot::Data(value) => value,
            Slot::Reactive(property) => property.get(),
        })
    }

    /// Read a property without recording a dependency.
    pub fn peek(&self, key: &str) -> Option<Value> {
        let slot = self.node.slots.read().get(key).cloned()?;
        Some(match slot {
            Slot::Data(value) => value,
            Slot::Reactive(property) => property.peek(),
        })
    }

    /// Write a property.
    ///
    /// Reactive properties run their setter. Keys that were not present when
    /// the object was observed are stored as plain data and are not tracked.
    pub fn set(&self, key: impl Into<Arc<str>>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();

        let reactive = match self.node.slots.read().get(&key) {
            Some(Slot::Reactive(property)) => Some(Arc::clone(property)),
            _ => None,
        };

        match reactive {
            Some(property) => property.set(value),
            None => {
                self.node.slots.write().insert(key, Slot::Data(value));
            }
        }
    }

    /// Remove a key, returning its last value. Removal is not tracked.
    pub fn remove(&self, key: &str) -> Option<Value> {
        let slot = self.node.slots.write().shift_remove(key)?;
        Some(match slot {
            Slot::Data(value) => value,
            Slot::Reactive(property) => property.peek(),
        })
    }

    /// Own keys in insertion order.
    pub fn keys(&self) -> Vec<Arc<str>> {
        self.node.slots.read().keys().cloned().collect()
    }

    /// Own key/value pairs in insertion order, read without tracking.
    pub fn entries(&self) -> Vec<(Arc<str>, Value)> {
        self.slots()
            .into_iter()
            .map(|(key, slot)| {
                let value = match slot {
                    Slot::Data(value) => value,
                    Slot::Reactive(property) => property.peek(),
                };
                (key, value)
            })
            .collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.node.slots.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.node.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.slots.read().is_empty()
    }

    /// The reactive property behind `key`, if the key has been converted.
    pub fn property(&self, key: &str) -> Option<Arc<ReactiveProperty>> {
        match self.node.slots.read().get(key)? {
            Slot::Reactive(property) => Some(Arc::clone(property)),
            Slot::Data(_) => None,
        }
    }

    /// Whether `key` is backed by a reactive property.
    pub fn is_reactive(&self, key: &str) -> bool {
        self.property(key).is_some()
    }

    /// Exclude this object from observation.
    ///
    /// Has no effect on an object that is already observed.
    pub fn mark_raw(&self) {
        self.node.raw.store(true, Ordering::SeqCst);
    }

    pub fn is_raw(&self) -> bool {
        self.node.raw.load(Ordering::SeqCst)
    }

    /// Snapshot of every slot, taken under a single read lock.
    pub(crate) fn slots(&self) -> Vec<(Arc<str>, Slot)> {
        self.node
            .slots
            .read()
            .iter()
            .map(|(key, slot)| (Arc::clone(key), slot.clone()))
            .collect()
    }

    /// Replace the slot behind `key`, keeping its position.
    pub(crate) fn install(&self, key: Arc<str>, slot: Slot) {
        self.node.slots.write().insert(key, slot);
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<Arc<str>>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let object = Object::new();
        {
            let mut slots = object.node.slots.write();
            for (key, value) in iter {
                slots.insert(key.into(), Slot::Data(value.into()));
            }
        }
        object
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Shallow on purpose: nodes may contain themselves.
        f.debug_struct("Object")
            .field("id", &self.id())
            .field("keys", &self.keys())
            .finish()
    }
}
