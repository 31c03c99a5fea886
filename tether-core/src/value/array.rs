//! Array Nodes
//!
//! An array is a shared, growable sequence of values. Its seven mutating
//! operations (`push`, `pop`, `shift`, `unshift`, `splice`, `sort`,
//! `reverse`) perform the plain operation and then hand the newly inserted
//! elements to the interception hook in [`crate::observer`]. For an array
//! that was never observed the hook does nothing.
//!
//! Index assignment ([`Array::set`]) and [`Array::truncate`] are deliberately
//! outside that funnel: they change the array without notifying anyone.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use super::{NodeId, Value};
use crate::observer::{self, ArrayMethod};

struct ArrayNode {
    id: NodeId,
    raw: AtomicBool,
    items: RwLock<Vec<Value>>,
}

impl Drop for ArrayNode {
    fn drop(&mut self) {
        observer::forget(self.id);
    }
}

/// Shared handle to an array node.
#[derive(Clone)]
pub struct Array {
    node: Arc<ArrayNode>,
}

impl Array {
    /// Create an empty array.
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    /// Get the node's identity.
    pub fn id(&self) -> NodeId {
        self.node.id
    }

    /// Check whether two handles point at the same node.
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    pub fn len(&self) -> usize {
        self.node.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.node.items.read().is_empty()
    }

    /// Element at `index`, if in bounds.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.node.items.read().get(index).cloned()
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.node.items.read().clone()
    }

    /// Assign by index, padding with `Null` when writing past the end.
    /// Returns the replaced element if `index` was in bounds.
    ///
    /// Not intercepted: nobody is notified and `value` is not observed.
    ///
    /// # Panics
    ///
    /// Padding allocates one slot per missing index, so an `index` whose
    /// padded length cannot be allocated (e.g. `usize::MAX`) panics with a
    /// capacity overflow, the same as `Vec::resize`. The array is left
    /// unchanged in that case. A length that fits but cannot be allocated
    /// aborts like any other `Vec` growth.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> Option<Value> {
        let mut items = self.node.items.write();
        if let Some(slot) = items.get_mut(index) {
            return Some(std::mem::replace(slot, value.into()));
        }
        let missing = index - items.len();
        items.reserve_exact(missing.saturating_add(1));
        items.resize(index, Value::Null);
        items.push(value.into());
        None
    }

    /// Shorten the array. Not intercepted.
    pub fn truncate(&self, len: usize) {
        self.node.items.write().truncate(len);
    }

    /// Append elements at the end, returning the new length.
    pub fn push<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: SmallVec<[Value; 4]> = values.into_iter().collect();
        let len = {
            let mut items = self.node.items.write();
            items.extend(inserted.iter().cloned());
            items.len()
        };
        observer::intercept(self, ArrayMethod::Push, &inserted);
        len
    }

    /// Remove and return the last element.
    pub fn pop(&self) -> Option<Value> {
        let removed = self.node.items.write().pop();
        observer::intercept(self, ArrayMethod::Pop, &[]);
        removed
    }

    /// Remove and return the first element.
    pub fn shift(&self) -> Option<Value> {
        let removed = {
            let mut items = self.node.items.write();
            if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            }
        };
        observer::intercept(self, ArrayMethod::Shift, &[]);
        removed
    }

    /// Insert elements at the start, keeping their order, and return the
    /// new length.
    pub fn unshift<I>(&self, values: I) -> usize
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: SmallVec<[Value; 4]> = values.into_iter().collect();
        let len = {
            let mut items = self.node.items.write();
            items.splice(0..0, inserted.iter().cloned());
            items.len()
        };
        observer::intercept(self, ArrayMethod::Unshift, &inserted);
        len
    }

    /// Remove `delete_count` elements starting at `start` and insert
    /// `values` in their place. Returns the removed elements.
    ///
    /// A negative `start` counts from the end. Both bounds are clamped.
    pub fn splice<I>(&self, start: isize, delete_count: usize, values: I) -> Vec<Value>
    where
        I: IntoIterator<Item = Value>,
    {
        let inserted: SmallVec<[Value; 4]> = values.into_iter().collect();
        let removed = {
            let mut items = self.node.items.write();
            let len = items.len();
            let start = if start < 0 {
                len.saturating_sub(start.unsigned_abs())
            } else {
                (start as usize).min(len)
            };
            let end = start + delete_count.min(len - start);
            items
                .splice(start..end, inserted.iter().cloned())
                .collect()
        };
        observer::intercept(self, ArrayMethod::Splice, &inserted);
        removed
    }

    /// Sort in place with [`Value::total_cmp`]. Returns the same array.
    ///
    /// This orders by type rank and then by value, so numbers sort
    /// numerically (`[10, 9, 1]` becomes `[1, 9, 10]`). It intentionally does
    /// not compare string renderings; use [`Array::sort_by`] for that.
    pub fn sort(&self) -> Array {
        self.sort_by(Value::total_cmp)
    }

    /// Stable sort in place with a custom comparator. Returns the same array.
    ///
    /// The comparator runs without any lock held on this array.
    pub fn sort_by<F>(&self, mut compare: F) -> Array
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let mut sorted = self.to_vec();
        sorted.sort_by(&mut compare);
        *self.node.items.write() = sorted;
        observer::intercept(self, ArrayMethod::Sort, &[]);
        self.clone()
    }

    /// Reverse in place. Returns the same array.
    pub fn reverse(&self) -> Array {
        self.node.items.write().reverse();
        observer::intercept(self, ArrayMethod::Reverse, &[]);
        self.clone()
    }

    /// Exclude this array from observation.
    ///
    /// Has no effect on an array that is already observed.
    pub fn mark_raw(&self) {
        self.node.raw.store(true, AtomicOrdering::SeqCst);
    }

    pub fn is_raw(&self) -> bool {
        self.node.raw.load(AtomicOrdering::SeqCst)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<Value>> for Array {
    fn from(items: Vec<Value>) -> Self {
        Self {
            node: Arc::new(ArrayNode {
                id: NodeId::new(),
                raw: AtomicBool::new(false),
                items: RwLock::new(items),
            }),
        }
    }
}

impl<V: Into<Value>> FromIterator<V> for Array {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self::from(iter.into_iter().map(Into::into).collect::<Vec<_>>())
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Array")
            .field("id", &self.id())
            .field("len", &self.len())
            .finish()
    }
}
