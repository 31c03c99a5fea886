//! Value Model
//!
//! Plain data trees: `null`, booleans, numbers, strings, objects with
//! ordered string keys, and arrays. Objects and arrays are shared handles
//! with identity, which is what lets [`observe`](crate::observe) instrument
//! them in place and lets two properties point at the same node.
//!
//! # Identity
//!
//! [`Value::same`] (and `==`) is the test the reactive setter uses to decide
//! whether a write is a change:
//!
//! - primitives compare by value (`NaN` is never the same as `NaN`);
//! - objects and arrays compare by handle identity, never structurally.
//!
//! # Serialization
//!
//! Values convert to and from `serde_json::Value` and implement serde's
//! traits. Serialization reads without tracking dependencies, and
//! observation metadata never appears in the output because it is not
//! stored on the node at all.

mod array;
mod object;

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

pub use array::Array;
pub use object::Object;
pub(crate) use object::Slot;

/// Process-unique identity of an object or array node.
///
/// IDs are never reused, so they are safe keys for side tables that outlive
/// individual nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dynamically typed plain-data value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Arc<str>),
    Object(Object),
    Array(Array),
}

impl Value {
    /// True for objects and arrays, the only values that can be observed.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Identity comparison used to detect changes.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    /// Identity of the underlying node, for objects and arrays.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Value::Object(object) => Some(object.id()),
            Value::Array(array) => Some(array.id()),
            _ => None,
        }
    }

    /// Whether the node was excluded from observation with `mark_raw`.
    pub fn is_raw(&self) -> bool {
        match self {
            Value::Object(object) => object.is_raw(),
            Value::Array(array) => array.is_raw(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Total order used by [`Array::sort`].
    ///
    /// `null < booleans < numbers < strings < arrays < objects`. Numbers use
    /// `f64::total_cmp`; arrays and objects are all equal to each other so a
    /// stable sort keeps their relative order.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Bool(_) => 1,
                Value::Number(_) => 2,
                Value::String(_) => 3,
                Value::Array(_) => 4,
                Value::Object(_) => 5,
            }
        }

        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => rank(self).cmp(&rank(other)),
        }
    }

    /// Parse JSON text into a fresh, unobserved tree.
    pub fn from_json_str(text: &str) -> Result<Value> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(Value::from(json))
    }

    /// Convert to `serde_json::Value` without tracking dependencies.
    ///
    /// Fails with [`Error::Cycle`] if a node contains itself.
    pub fn to_json(&self) -> Result<serde_json::Value> {
        let mut path = Vec::new();
        self.to_json_inner(&mut path)
    }

    fn to_json_inner(&self, path: &mut Vec<NodeId>) -> Result<serde_json::Value> {
        if let Some(id) = self.node_id() {
            if path.contains(&id) {
                return Err(Error::Cycle(id));
            }
            path.push(id);
        }

        let json = match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Object(object) => {
                let mut map = serde_json::Map::new();
                for (key, value) in object.entries() {
                    map.insert(key.to_string(), value.to_json_inner(path)?);
                }
                serde_json::Value::Object(map)
            }
            Value::Array(array) => serde_json::Value::Array(
                array
                    .to_vec()
                    .iter()
                    .map(|item| item.to_json_inner(path))
                    .collect::<Result<_>>()?,
            ),
        };

        if self.node_id().is_some() {
            path.pop();
        }
        Ok(json)
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // Integral values print without a trailing `.0`.
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return serde_json::Value::from(n as i64);
    }
    serde_json::Number::from_f64(n)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Object(object) => fmt::Debug::fmt(object, f),
            Value::Array(array) => fmt::Debug::fmt(array, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            other => match other.to_json() {
                Ok(json) => write!(f, "{json}"),
                Err(_) => f.write_str("[cyclic]"),
            },
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Object> for Value {
    fn from(object: Object) -> Self {
        Value::Object(object)
    }
}

impl From<Array> for Value {
    fn from(array: Array) -> Self {
        Value::Array(array)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl TryFrom<Value> for Object {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Ok(object),
            other => Err(Error::TypeMismatch {
                expected: "object",
                found: other.type_name(),
            }),
        }
    }
}

impl TryFrom<Value> for Array {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Array(array) => Ok(array),
            other => Err(Error::TypeMismatch {
                expected: "array",
                found: other.type_name(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_object_only_for_containers() {
        assert!(Value::from(Object::new()).is_object());
        assert!(Value::from(Array::new()).is_object());
        assert!(!Value::Null.is_object());
        assert!(!Value::from(1).is_object());
        assert!(!Value::from("x").is_object());
    }

    #[test]
    fn primitives_compare_by_value() {
        assert!(Value::from(1).same(&Value::from(1.0)));
        assert!(Value::from("a").same(&Value::from(String::from("a"))));
        assert!(!Value::from(1).same(&Value::from("1")));
        assert!(!Value::from(f64::NAN).same(&Value::from(f64::NAN)));
    }

    #[test]
    fn containers_compare_by_identity() {
        let a = Value::from_json_str(r#"{"x": 1}"#).unwrap();
        let b = Value::from_json_str(r#"{"x": 1}"#).unwrap();
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
    }

    #[test]
    fn json_round_trip_preserves_shape_and_order() {
        let text = r#"{"b":1,"a":[true,null,"s",{"c":2.5}]}"#;
        let value = Value::from_json_str(text).unwrap();
        assert_eq!(serde_json::to_string(&value).unwrap(), text);
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert!(matches!(Value::from_json_str("{"), Err(Error::Json(_))));
    }

    #[test]
    fn cycles_are_reported() {
        let object = Object::new();
        object.set("me", object.clone());
        let err = Value::from(object.clone()).to_json().unwrap_err();
        assert!(matches!(err, Error::Cycle(id) if id == object.id()));
    }

    #[test]
    fn shared_nodes_are_not_cycles() {
        let shared = Value::from(Object::new());
        let parent = Object::new();
        parent.set("a", shared.clone());
        parent.set("b", shared);
        assert_eq!(
            Value::from(parent).to_json().unwrap(),
            serde_json::json!({"a": {}, "b": {}})
        );
    }

    #[test]
    fn total_order_ranks_types() {
        let mut items = vec![
            Value::from("b"),
            Value::from(Object::new()),
            Value::from(2),
            Value::Null,
            Value::from(true),
            Value::from("a"),
            Value::from(-1),
        ];
        items.sort_by(Value::total_cmp);
        let names: Vec<_> = items.iter().map(Value::type_name).collect();
        assert_eq!(
            names,
            ["null", "boolean", "number", "number", "string", "string", "object"]
        );
        assert_eq!(items[2], Value::from(-1));
        assert_eq!(items[4], Value::from("a"));
    }

    #[test]
    fn try_from_reports_mismatch() {
        let err = Object::try_from(Value::from(3)).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch { expected: "object", found: "number" }
        ));
    }

    #[test]
    fn display_renders_compact_json() {
        let value = Value::from_json_str(r#"{"n": 3, "list": [1.5, "x"]}"#).unwrap();
        assert_eq!(value.to_string(), r#"{"n":3,"list":[1.5,"x"]}"#);
        assert_eq!(Value::from("plain").to_string(), "plain");
    }
}
