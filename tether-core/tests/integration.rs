//! Integration Tests for Observation
//!
//! These tests drive observed trees end to end: observe, read under a
//! subscriber, write, and count notifications.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::reactive::{ReactiveContext, Subscriber, SubscriberId, Watcher};
use tether_core::{is_observed, observe, observer_of, Array, Object, Value};

/// Counts how often it was notified.
struct Counter {
    id: SubscriberId,
    hits: AtomicUsize,
}

impl Counter {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            id: SubscriberId::new(),
            hits: AtomicUsize::new(0),
        })
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// Run `read` with this counter as the active subscriber.
    fn track<T>(self: &Arc<Self>, read: impl FnOnce() -> T) -> T {
        let _ctx = ReactiveContext::enter(self.clone());
        read()
    }
}

impl Subscriber for Counter {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }
}

fn object(json: &str) -> (Value, Object) {
    let value = Value::from_json_str(json).unwrap();
    let object = value.as_object().unwrap().clone();
    (value, object)
}

/// Observing twice yields the same Observer and does not re-wrap.
#[test]
fn observe_is_idempotent() {
    let (value, object) = object(r#"{"a": 1}"#);

    let first = observe(&value).unwrap();
    let property = object.property("a").unwrap();

    assert!(observe(&value).is_none());
    assert!(Arc::ptr_eq(&first, &observer_of(&value).unwrap()));
    assert!(Arc::ptr_eq(&property, &object.property("a").unwrap()));
}

/// Values read back unchanged right after observation.
#[test]
fn observation_preserves_values() {
    let (value, object) = object(r#"{"a": 1, "b": "text", "c": null, "d": [1, 2]}"#);
    observe(&value);

    assert_eq!(object.get("a"), Some(Value::from(1)));
    assert_eq!(object.get("b"), Some(Value::from("text")));
    assert_eq!(object.get("c"), Some(Value::Null));
    assert_eq!(object.get("d").unwrap().as_array().unwrap().len(), 2);
}

/// A change notifies once, an identical write notifies nobody.
#[test]
fn notification_on_change_only() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    let counter = Counter::new();
    counter.track(|| object.get("a"));

    object.set("a", 2);
    assert_eq!(counter.hits(), 1);

    object.set("a", 2);
    assert_eq!(counter.hits(), 1);

    object.set("a", 1);
    assert_eq!(counter.hits(), 2);
}

/// The full capture scenario: read under `w`, clear, write.
#[test]
fn dependency_capture_scenario() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);
    let registry = Arc::clone(object.property("a").unwrap().dep());

    let w = Counter::new();
    {
        let _ctx = ReactiveContext::enter(w.clone());
        assert_eq!(object.get("a"), Some(Value::from(1)));
    }
    assert!(!ReactiveContext::is_active());
    assert!(registry.contains(w.id));

    object.set("a", 2);
    assert_eq!(w.hits(), 1);
}

/// Reads outside any evaluation create no edges.
#[test]
fn reads_without_subscriber_are_untracked() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    object.get("a");
    assert_eq!(object.property("a").unwrap().dep().subscriber_count(), 0);
}

/// Assigning a fresh object makes its contents independently observable.
#[test]
fn nested_reactivity_on_assignment() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    let outer = Counter::new();
    outer.track(|| object.get("a"));

    let (fresh, inner_object) = self::object(r#"{"b": 1}"#);
    object.set("a", fresh.clone());
    assert_eq!(outer.hits(), 1);
    assert!(is_observed(&fresh));

    let inner = Counter::new();
    inner.track(|| object.get("a").unwrap().as_object().unwrap().get("b"));

    let b_dep = inner_object.property("b").unwrap().dep().clone();
    let a_dep = object.property("a").unwrap().dep().clone();
    assert_ne!(a_dep.id(), b_dep.id());

    inner_object.set("b", 2);
    assert_eq!(inner.hits(), 1);
    // Writing b is not a write to a.
    assert_eq!(outer.hits(), 1);
}

/// Reassigning an already observed node does not wrap it again.
#[test]
fn reassigning_observed_node_is_safe() {
    let (value, object) = object(r#"{"a": {"x": 1}, "b": null}"#);
    observe(&value);

    let shared = object.peek("a").unwrap();
    let owner = observer_of(&shared).unwrap();
    let x = shared.as_object().unwrap().property("x").unwrap();

    object.set("b", shared.clone());

    assert!(Arc::ptr_eq(&owner, &observer_of(&object.peek("b").unwrap()).unwrap()));
    assert!(Arc::ptr_eq(&x, &shared.as_object().unwrap().property("x").unwrap()));
}

/// Push appends, returns the new length, notifies once, observes the item.
#[test]
fn array_push() {
    let (value, object) = object(r#"{"list": [1, 2]}"#);
    observe(&value);

    let counter = Counter::new();
    let list = counter.track(|| object.get("list")).unwrap();
    let array = list.as_array().unwrap();

    let (item, item_object) = self::object(r#"{"k": 1}"#);
    assert_eq!(array.push([item.clone()]), 3);
    assert_eq!(counter.hits(), 1);
    assert!(array.get(2).unwrap().same(&item));

    let item_counter = Counter::new();
    item_counter.track(|| item_object.get("k"));
    item_object.set("k", 2);
    assert_eq!(item_counter.hits(), 1);
}

/// Splice insertion observes the inserted element and notifies once.
#[test]
fn array_splice_insertion() {
    let array: Array = [1, 2, 3].into_iter().collect();
    let list = Value::from(array.clone());
    observe(&list);

    let counter = Counter::new();
    let subscriber: Arc<dyn Subscriber> = counter.clone();
    observer_of(&list).unwrap().dep().add_subscriber(&subscriber);

    let (y, _) = object(r#"{"y": true}"#);
    let removed = array.splice(1, 0, [y.clone()]);

    assert!(removed.is_empty());
    assert!(array.get(1).unwrap().same(&y));
    assert_eq!(array.len(), 4);
    assert!(is_observed(&y));
    assert_eq!(counter.hits(), 1);
}

/// Sort and reverse insert nothing but still notify once each.
#[test]
fn no_argument_mutators_notify() {
    let (value, object) = object(r#"{"list": [3, 1, 2]}"#);
    observe(&value);

    let counter = Counter::new();
    let list = counter.track(|| object.get("list")).unwrap();
    let array = list.as_array().unwrap();

    array.sort();
    assert_eq!(counter.hits(), 1);

    array.reverse();
    assert_eq!(counter.hits(), 2);

    let numbers: Vec<_> = array.to_vec().iter().filter_map(Value::as_f64).collect();
    assert_eq!(numbers, [3.0, 2.0, 1.0]);
}

/// Observation metadata is invisible to enumeration and serialization.
#[test]
fn marker_never_alters_shape() {
    let text = r#"{"a":1,"nested":{"b":[1,{"c":2}]}}"#;
    let (value, object) = object(text);
    observe(&value);

    let keys: Vec<_> = object.keys().iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, ["a", "nested"]);
    assert_eq!(serde_json::to_string(&value).unwrap(), text);
}

/// Serializing an observed tree does not subscribe anyone.
#[test]
fn serialization_is_untracked() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    let counter = Counter::new();
    counter.track(|| serde_json::to_value(&value).unwrap());

    assert_eq!(object.property("a").unwrap().dep().subscriber_count(), 0);
}

/// Keys added after observation stay plain.
#[test]
fn keys_added_later_are_not_reactive() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    object.set("late", 1);
    assert!(!object.is_reactive("late"));

    let counter = Counter::new();
    counter.track(|| object.get("late"));
    object.set("late", 2);
    assert_eq!(counter.hits(), 0);
}

/// Subscribers run in registration order on each write.
#[test]
fn notification_order_is_registration_order() {
    struct Logger {
        id: SubscriberId,
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl Subscriber for Logger {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn update(&self) {
            self.log.lock().push(self.name);
        }
    }

    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    let log = Arc::new(Mutex::new(Vec::new()));
    let loggers: Vec<Arc<Logger>> = ["first", "second", "third"]
        .into_iter()
        .map(|name| {
            Arc::new(Logger {
                id: SubscriberId::new(),
                name,
                log: Arc::clone(&log),
            })
        })
        .collect();

    for logger in &loggers {
        let _ctx = ReactiveContext::enter(logger.clone());
        object.get("a");
    }

    object.set("a", 2);
    assert_eq!(*log.lock(), ["first", "second", "third"]);
}

/// A watcher re-runs when what it read changes and sees the new value.
#[test]
fn watcher_reacts_to_property_writes() {
    let (value, object) = object(r#"{"count": 0}"#);
    observe(&value);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (reader, sink) = (object.clone(), Arc::clone(&seen));
    let watcher = Watcher::new(move || {
        let count = reader.get("count").and_then(|v| v.as_f64());
        sink.lock().push(count);
    });

    object.set("count", 1);
    object.set("count", 1);
    object.set("count", 5);

    assert_eq!(*seen.lock(), [Some(0.0), Some(1.0), Some(5.0)]);
    assert_eq!(watcher.run_count(), 3);
}

/// A watcher reading an array re-runs on every mutator call.
#[test]
fn watcher_reacts_to_array_mutation() {
    let (value, object) = object(r#"{"items": []}"#);
    observe(&value);

    let lengths = Arc::new(Mutex::new(Vec::new()));
    let (reader, sink) = (object.clone(), Arc::clone(&lengths));
    let _watcher = Watcher::new(move || {
        let len = reader.get("items").unwrap().as_array().unwrap().len();
        sink.lock().push(len);
    });

    let items = object.peek("items").unwrap();
    let array = items.as_array().unwrap();
    array.push([Value::from("a"), Value::from("b")]);
    array.pop();

    assert_eq!(*lengths.lock(), [0, 2, 1]);
}

/// A watcher that writes what it reads settles instead of recursing.
#[test]
fn watcher_writing_its_own_dependency_settles() {
    let (value, object) = object(r#"{"n": 0}"#);
    observe(&value);

    let handle = object.clone();
    let watcher = Watcher::new(move || {
        let n = handle.get("n").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if n < 3.0 {
            handle.set("n", n + 1.0);
        }
    });

    assert_eq!(watcher.run_count(), 1);
    assert_eq!(object.peek("n"), Some(Value::from(1)));
}

/// A panicking subscriber surfaces from `set` after the value is stored,
/// and later subscribers in that pass are skipped.
#[test]
fn panicking_subscriber_propagates_after_commit() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    let reader = object.clone();
    let failing = Watcher::new(move || {
        if reader.get("a").and_then(|v| v.as_f64()) == Some(2.0) {
            panic!("render failed");
        }
    });
    let later = Counter::new();
    later.track(|| object.get("a"));

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| object.set("a", 2)));

    assert!(result.is_err());
    assert!(!ReactiveContext::is_active());
    assert_eq!(later.hits(), 0);
    assert_eq!(object.peek("a"), Some(Value::from(2)));
    assert_eq!(failing.run_count(), 1);
}

/// Dropped watchers do not accumulate in a registry that is never written.
#[test]
fn dropped_watchers_do_not_accumulate() {
    let (value, object) = object(r#"{"a": 1}"#);
    observe(&value);

    for _ in 0..1000 {
        let reader = object.clone();
        drop(Watcher::new(move || {
            reader.get("a");
        }));
    }

    assert_eq!(object.property("a").unwrap().dep().subscriber_count(), 0);
}
