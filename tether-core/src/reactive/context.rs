//! Reactive Context
//!
//! The reactive context tracks which subscriber is currently evaluating.
//! This enables implicit dependency capture: when an observed property is
//! read, its registry asks the context who is reading and records that
//! subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack instead of a single global slot. Entering a
//! context pushes an entry and returns a guard; dropping the guard pops it.
//! Nested evaluation (a subscriber that triggers another subscriber's
//! evaluation) therefore restores the outer subscriber automatically.
//!
//! An entry can also be *untracked*: reads inside [`untracked`] see no
//! active subscriber even when an outer one exists.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use super::dep::{Dep, DepId};
use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The evaluating subscriber, or `None` for an untracked scope.
    subscriber: Option<Arc<dyn Subscriber>>,
    /// Registries read during this evaluation, in first-read order.
    dependencies: IndexMap<DepId, Arc<Dep>>,
}

/// Guard that pops the context when dropped.
///
/// This ensures the context stack is properly maintained even if
/// the evaluation panics. The guard is bound to the thread that created it.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
    _not_send: PhantomData<*const ()>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, every observed property that is read
    /// registers the subscriber on its registry.
    pub fn enter(subscriber: Arc<dyn Subscriber>) -> Self {
        let subscriber_id = Some(subscriber.id());
        Self::push(Some(subscriber));
        Self {
            subscriber_id,
            _not_send: PhantomData,
        }
    }

    /// Enter a scope in which reads establish no dependencies.
    pub fn enter_untracked() -> Self {
        Self::push(None);
        Self {
            subscriber_id: None,
            _not_send: PhantomData,
        }
    }

    fn push(subscriber: Option<Arc<dyn Subscriber>>) {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber,
                dependencies: IndexMap::new(),
            });
        });
    }

    /// Check if a subscriber is currently evaluating.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber.is_some())
        })
    }

    /// The subscriber currently evaluating, if any.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.clone())
        })
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.as_ref().map(|s| s.id()))
        })
    }

    /// Record that the current evaluation read `dep`.
    ///
    /// Called by [`Dep::depend`]. Untracked scopes ignore it.
    pub fn track_dependency(dep: &Arc<Dep>) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                if entry.subscriber.is_some() {
                    entry
                        .dependencies
                        .entry(dep.id())
                        .or_insert_with(|| Arc::clone(dep));
                }
            }
        });
    }

    /// IDs of the registries read so far in the current context.
    pub fn get_dependencies() -> Vec<DepId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.keys().copied().collect())
                .unwrap_or_default()
        })
    }

    /// Take the registries read so far, leaving the entry's list empty.
    pub fn take_dependencies() -> IndexMap<DepId, Arc<Dep>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .map(|entry| std::mem::take(&mut entry.dependencies))
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        // Verify we're popping the right context.
        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.subscriber.as_ref().map(|s| s.id()),
                self.subscriber_id,
                "ReactiveContext mismatch"
            );
        }
    }
}

/// Run `f` without recording any dependencies.
pub fn untracked<T>(f: impl FnOnce() -> T) -> T {
    let _ctx = ReactiveContext::enter_untracked();
    f()
}
