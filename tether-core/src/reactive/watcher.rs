//! Watcher Implementation
//!
//! A Watcher is a ready-made [`Subscriber`]: it evaluates a closure inside a
//! [`ReactiveContext`] so that every observed property the closure reads
//! registers the watcher, and it re-evaluates synchronously whenever one of
//! those registries notifies.
//!
//! # Dependency cleanup
//!
//! After each evaluation the watcher compares the registries it just read
//! with the ones it read last time and unsubscribes from those it no longer
//! touches. A branch that stopped reading `a.x` stops being woken by `a.x`.
//!
//! Scheduling, batching and deduplication of re-runs across registries are
//! not handled here; a write that touches two registries the watcher reads
//! re-runs it twice.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::dep::{Dep, DepId};
use super::subscriber::{Subscriber, SubscriberId};

/// A subscriber that re-runs a closure when what it read changes.
///
/// # Example
///
/// ```rust,ignore
/// let state = Value::from_json_str(r#"{"count": 0}"#)?;
/// observe(&state);
/// let object = state.as_object().unwrap().clone();
///
/// let watcher = Watcher::new(move || {
///     println!("count is {}", object.get("count").unwrap());
/// });
///
/// state.as_object().unwrap().set("count", 1); // prints "count is 1"
/// ```
pub struct Watcher {
    id: SubscriberId,

    /// Back-reference used to enter a context as an `Arc<dyn Subscriber>`.
    this: Weak<Watcher>,

    run: Box<dyn Fn() + Send + Sync>,

    /// Registries read during the last evaluation.
    dependencies: Mutex<IndexMap<DepId, Arc<Dep>>>,

    disposed: AtomicBool,

    /// Set while the closure runs; a write to something the closure already
    /// read would otherwise re-enter `execute` without bound.
    running: AtomicBool,

    run_count: AtomicUsize,
}

impl Watcher {
    /// Create a watcher and evaluate it immediately.
    pub fn new<F>(run: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let watcher = Self::new_lazy(run);
        watcher.execute();
        watcher
    }

    /// Create a watcher without evaluating it.
    ///
    /// It will not be registered anywhere until [`Watcher::execute`] runs.
    pub fn new_lazy<F>(run: F) -> Arc<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        Arc::new_cyclic(|this| Self {
            id: SubscriberId::new(),
            this: this.clone(),
            run: Box::new(run),
            dependencies: Mutex::new(IndexMap::new()),
            disposed: AtomicBool::new(false),
            running: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        })
    }

    /// Evaluate the closure, recording which registries it reads.
    pub fn execute(&self) {
        if self.is_disposed() {
            return;
        }
        let Some(this) = self.this.upgrade() else {
            return;
        };
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::trace!(watcher = self.id.raw(), "skipping re-entrant run");
            return;
        }

        let read = {
            let _running = RunningGuard(&self.running);
            let _ctx = ReactiveContext::enter(this);
            (self.run)();
            ReactiveContext::take_dependencies()
        };

        let stale: Vec<Arc<Dep>> = {
            let mut dependencies = self.dependencies.lock();
            let previous = std::mem::replace(&mut *dependencies, read);
            previous
                .into_iter()
                .filter(|(id, _)| !dependencies.contains_key(id))
                .map(|(_, dep)| dep)
                .collect()
        };
        for dep in stale {
            dep.remove_subscriber(self.id);
        }

        self.run_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Stop re-evaluating and unsubscribe from every registry.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        let dependencies = std::mem::take(&mut *self.dependencies.lock());
        for dep in dependencies.values() {
            dep.remove_subscriber(self.id);
        }
        tracing::trace!(watcher = self.id.raw(), "watcher disposed");
    }

    /// Check if the watcher has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of completed evaluations.
    pub fn run_count(&self) -> usize {
        self.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of registries read during the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.dependencies.lock().len()
    }

    /// IDs of the registries read during the last evaluation.
    pub fn dependencies(&self) -> Vec<DepId> {
        self.dependencies.lock().keys().copied().collect()
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        for dep in self.dependencies.get_mut().values() {
            dep.remove_subscriber(self.id);
        }
    }
}

impl Subscriber for Watcher {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) {
        self.execute();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
