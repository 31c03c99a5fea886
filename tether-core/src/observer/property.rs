//! Reactive Properties
//!
//! A reactive property replaces a plain data slot with a getter/setter pair
//! backed by its own value cell and its own [`Dep`].
//!
//! - **get**: while a subscriber is evaluating, registers it on the
//!   property's registry. If the value is itself observed, the subscriber is
//!   also registered on that node's registry (and, for arrays, on the
//!   registries of observed elements) so that structural changes such as
//!   `push` reach it.
//! - **set**: ignores writes of an identical value. Otherwise observes the
//!   new value, stores it, then notifies the property's registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::{observe, observer_of};
use crate::reactive::{Dep, ReactiveContext};
use crate::value::{Array, NodeId, Object, Slot, Value};

/// A (key, value, registry) triple installed on an object.
pub struct ReactiveProperty {
    key: Arc<str>,
    value: RwLock<Value>,
    dep: Arc<Dep>,
}

impl ReactiveProperty {
    /// The key this property was defined under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The registry owned by this property.
    pub fn dep(&self) -> &Arc<Dep> {
        &self.dep
    }

    /// Read the value, recording the active subscriber.
    pub fn get(&self) -> Value {
        let value = self.value.read().clone();

        if ReactiveContext::is_active() {
            self.dep.depend();
            if let Some(child) = observer_of(&value) {
                child.dep().depend();
                if let Value::Array(array) = &value {
                    depend_array(array, &mut SmallVec::new());
                }
            }
        }

        value
    }

    /// Read the value without recording anything.
    pub fn peek(&self) -> Value {
        self.value.read().clone()
    }

    /// Write a value, notifying subscribers if it is not identical to the
    /// current one.
    pub fn set(&self, value: impl Into<Value>) {
        let value = value.into();
        if self.value.read().same(&value) {
            return;
        }

        observe(&value);
        *self.value.write() = value;

        tracing::debug!(key = %self.key, dep = self.dep.id().raw(), "property changed");
        self.dep.notify();
    }
}

impl fmt::Debug for ReactiveProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveProperty")
            .field("key", &self.key)
            .field("value", &*self.value.read())
            .field("dep", &self.dep)
            .finish()
    }
}

/// Register the active subscriber on every observed element of `array`,
/// descending into nested arrays.
fn depend_array(array: &Array, visited: &mut SmallVec<[NodeId; 8]>) {
    if visited.contains(&array.id()) {
        return;
    }
    visited.push(array.id());

    for item in array.to_vec() {
        if let Some(observer) = observer_of(&item) {
            observer.dep().depend();
        }
        if let Value::Array(inner) = &item {
            depend_array(inner, visited);
        }
    }
}

/// Install a reactive property for `key` on `object`, replacing whatever the
/// slot held.
///
/// `value` is observed before the property becomes readable. Re-defining a
/// key creates a fresh registry; subscribers of the old one are not carried
/// over.
pub fn define_reactive(
    object: &Object,
    key: impl Into<Arc<str>>,
    value: impl Into<Value>,
) -> Arc<ReactiveProperty> {
    let key = key.into();
    let value = value.into();

    let dep = Arc::new(Dep::new());
    observe(&value);

    let property = Arc::new(ReactiveProperty {
        key: Arc::clone(&key),
        value: RwLock::new(value),
        dep,
    });
    object.install(key, Slot::Reactive(Arc::clone(&property)));
    property
}
