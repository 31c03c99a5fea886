//! Tether Core
//!
//! Transparent observation of plain data trees. Given a tree of objects and
//! arrays, [`observe`] instruments it in place so that:
//!
//! - reading a property while a subscriber is evaluating records that
//!   subscriber as a dependent of the property;
//! - writing a different value to the property notifies every recorded
//!   subscriber, synchronously;
//! - the seven mutating array operations notify the array's own registry.
//!
//! This is the piece a rendering layer uses to learn *when* to recompute.
//! Deciding *what* to recompute, batching, and scheduling live outside.
//!
//! # Architecture
//!
//! - `value`: the dynamic data model (`Value`, `Object`, `Array`)
//! - `reactive`: registries, subscribers, and the active-subscriber context
//! - `observer`: `observe`, reactive properties, and array interception
//! - `config`: the per-thread observation switch
//!
//! # Example
//!
//! ```rust,ignore
//! use tether_core::{observe, Value};
//! use tether_core::reactive::Watcher;
//!
//! let state = Value::from_json_str(r#"{"count": 0, "items": []}"#)?;
//! observe(&state);
//!
//! let object = state.as_object().unwrap().clone();
//! let reader = object.clone();
//! let watcher = Watcher::new(move || {
//!     println!("count = {}", reader.get("count").unwrap());
//! });
//!
//! object.set("count", 1);       // prints "count = 1"
//! object.set("count", 1);       // same value, nothing happens
//! ```

pub mod config;
pub mod error;
pub mod observer;
pub mod reactive;
pub mod value;

pub use error::{Error, Result};
pub use observer::{
    define_reactive, is_observed, observe, observer_of, ArrayMethod, ObservedKind, Observer,
    ReactiveProperty,
};
pub use value::{Array, NodeId, Object, Value};
