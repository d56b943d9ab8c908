//! # Dynamic Values
//!
//! Attribute defaults, overrides and instance properties are dynamically typed:
//! one attribute may default to a number, another to a list of tags, a third to
//! a function that stamps the creation time. [`Value`] is the runtime
//! representation of all of them.
//!
//! ## Reference Semantics
//!
//! Aggregates ([`ArrayRef`], [`ObjectRef`]) and functions ([`Thunk`]) are
//! *shared handles*. Rust's `Clone` on them copies the handle, not the data, so
//! two instances holding a cloned handle observe each other's mutations. That is
//! exactly the `copy_mode: none` behaviour; the `shallow`/`deep` modes go
//! through [`clone_value`] to produce fresh containers.
//!
//! | Variant | Clone (`Clone`) | [`clone_value`] |
//! |---------|-----------------|-----------------|
//! | `Null`, `Bool`, `Number`, `String` | value copy | value copy |
//! | `Date`, `Regex` | value copy | value copy (regex keeps `last_index`) |
//! | `Array`, `Object` | shared handle | new container, deep or one level |
//! | `Function` | shared handle | shared handle |
//!
//! Use [`Value::same_as`] for identity checks and `==` for structural equality.

mod clone;
mod regexp;

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};

use crate::model::Model;

pub use self::clone::{clone_value, CopyMode};
pub use self::regexp::RegexValue;

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// The "nothing" sentinel. Attributes declared without a default hold it.
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Regex(RegexValue),
    Array(ArrayRef),
    Object(ObjectRef),
    /// Zero-argument function, evaluated when an instance is built.
    Function(Thunk),
}

impl Value {
    /// Build an array value from anything convertible to values.
    pub fn array<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::Array(ArrayRef::new(items.into_iter().map(Into::into).collect()))
    }

    /// Build a plain object value from key/value pairs (insertion order kept).
    pub fn object<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Object(ObjectRef::from_pairs(pairs))
    }

    /// Wrap a closure as a lazily evaluated function value.
    pub fn function(f: impl Fn() -> Value + 'static) -> Self {
        Value::Function(Thunk::new(f))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Regex(_) => "regexp",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the number as an integer, if it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_regex(&self) -> Option<&RegexValue> {
        match self {
            Value::Regex(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Identity comparison.
    ///
    /// Aggregates and functions are the same only if they are the same handle;
    /// everything else compares by value.
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (a, b) => a == b,
        }
    }

    /// Convert from JSON. Numbers become `f64`, objects keep serde_json's key order.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from_json)),
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from_json(v))))
            }
        }
    }

    /// Render as JSON.
    ///
    /// Dates become RFC 3339 strings, regexes their `/source/flags` literal, and
    /// functions the placeholder `"[Function]"` (they are never invoked here).
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Regex(r) => serde_json::Value::String(r.to_string()),
            Value::Array(a) => serde_json::Value::Array(a.borrow().iter().map(Value::to_json).collect()),
            Value::Object(o) => {
                let object = o.borrow();
                serde_json::Value::Object(
                    object
                        .props
                        .iter()
                        .map(|(k, v)| (k.clone(), v.to_json()))
                        .collect(),
                )
            }
            Value::Function(_) => serde_json::Value::String("[Function]".to_string()),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    // 2^53: the largest range where f64 holds every integer exactly
    const MAX_SAFE: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() < MAX_SAFE {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b) || *a.borrow() == *b.borrow(),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Regex(r) => write!(f, "{}", r),
            Value::Function(_) => write!(f, "[Function]"),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

macro_rules! value_from_number {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(n: $ty) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

value_from_number!(i32, i64, u32, u64, usize, f32, f64);

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<RegexValue> for Value {
    fn from(r: RegexValue) -> Self {
        Value::Regex(r)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(ArrayRef::new(items))
    }
}

impl From<ArrayRef> for Value {
    fn from(a: ArrayRef) -> Self {
        Value::Array(a)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

impl From<Thunk> for Value {
    fn from(t: Thunk) -> Self {
        Value::Function(t)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Shared, mutable, ordered sequence.
#[derive(Clone, Default)]
pub struct ArrayRef(Rc<RefCell<Vec<Value>>>);

impl ArrayRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(items)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    pub fn push(&self, value: impl Into<Value>) {
        self.0.borrow_mut().push(value.into());
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.0.borrow().iter().any(|item| item == value)
    }

    /// Copy the element handles out into a plain vector.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    pub fn ptr_eq(&self, other: &ArrayRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ArrayRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.borrow().iter()).finish()
    }
}

/// Backing storage of an [`ObjectRef`]: ordered properties plus an optional
/// link to the model that built it.
#[derive(Default)]
pub struct Object {
    pub(crate) model: Option<Model>,
    pub(crate) props: Vec<(String, Value)>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn props(&self) -> &[(String, Value)] {
        &self.props
    }

    pub(crate) fn set(&mut self, key: &str, value: Value) {
        match self.props.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => self.props.push((key.to_string(), value)),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        let same_model = match (&self.model, &other.model) {
            (Some(a), Some(b)) => a.ptr_eq(b),
            (None, None) => true,
            _ => false,
        };
        same_model
            && self.props.len() == other.props.len()
            && self
                .props
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|o| o == v))
    }
}

/// Shared, mutable key/value object. Model instances are objects too; see
/// [`crate::model::Instance`].
#[derive(Clone, Default)]
pub struct ObjectRef(Rc<RefCell<Object>>);

impl ObjectRef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let object = Self::new();
        for (k, v) in pairs {
            object.set(&k.into(), v);
        }
        object
    }

    pub(crate) fn from_object(object: Object) -> Self {
        Self(Rc::new(RefCell::new(object)))
    }

    /// A blank object linked to `model`, before any attribute is assigned.
    pub(crate) fn with_model(model: Model) -> Self {
        Self::from_object(Object {
            model: Some(model),
            props: Vec::new(),
        })
    }

    pub fn model(&self) -> Option<Model> {
        self.0.borrow().model.clone()
    }

    /// The name of the model this object was built by, if any.
    pub fn model_name(&self) -> Option<String> {
        self.0.borrow().model.as_ref().map(|m| m.name().to_string())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.borrow().get(key).is_some()
    }

    /// Set a property, keeping its original position if it already exists.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.0.borrow_mut().set(key, value.into());
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut object = self.0.borrow_mut();
        let pos = object.props.iter().position(|(k, _)| k == key)?;
        Some(object.props.remove(pos).1)
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.borrow().props.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn entries(&self) -> Vec<(String, Value)> {
        self.0.borrow().props.clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().props.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().props.is_empty()
    }

    pub fn borrow(&self) -> Ref<'_, Object> {
        self.0.borrow()
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn to_json(&self) -> serde_json::Value {
        Value::Object(self.clone()).to_json()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let object = self.0.borrow();
        if let Some(model) = &object.model {
            write!(f, "{} ", model.name())?;
        }
        f.debug_map()
            .entries(object.props.iter().map(|(k, v)| (k, v)))
            .finish()
    }
}

/// A shared zero-argument function producing a [`Value`].
#[derive(Clone)]
pub struct Thunk(Rc<dyn Fn() -> Value>);

impl Thunk {
    pub fn new(f: impl Fn() -> Value + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self) -> Value {
        (self.0)()
    }

    pub fn ptr_eq(&self, other: &Thunk) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Thunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_round_trip_keeps_structure() {
        let value = Value::from_json(json!({"side": "dark", "power": 100, "tags": ["a", "b"]}));
        let object = value.as_object().unwrap();
        assert_eq!(object.get("side"), Some(Value::from("dark")));
        assert_eq!(object.get("power").and_then(|v| v.as_i64()), Some(100));
        assert_eq!(object.get("tags").unwrap().as_array().unwrap().len(), 2);
        assert_eq!(value.to_json(), json!({"side": "dark", "power": 100, "tags": ["a", "b"]}));
    }

    #[test]
    fn integral_numbers_render_as_integers() {
        assert_eq!(Value::from(3).to_json(), json!(3));
        assert_eq!(Value::from(2.5).to_json(), json!(2.5));
        assert_eq!(Value::Number(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn functions_render_as_placeholder() {
        let value = Value::function(|| Value::from(1));
        assert_eq!(value.to_json(), json!("[Function]"));
        assert_eq!(value.to_string(), "[Function]");
    }

    #[test]
    fn equality_is_structural_for_aggregates() {
        let a = Value::array([1, 2]);
        let b = Value::array([1, 2]);
        assert_eq!(a, b);
        assert!(!a.same_as(&b));
        assert!(a.same_as(&a.clone()));
    }

    #[test]
    fn functions_compare_by_reference() {
        let f = Value::function(|| Value::Null);
        let g = Value::function(|| Value::Null);
        assert_eq!(f, f.clone());
        assert_ne!(f, g);
    }

    #[test]
    fn object_equality_ignores_key_order() {
        let a = Value::object([("one", 1), ("two", 2)]);
        let b = Value::object([("two", 2), ("one", 1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn object_set_keeps_insertion_order() {
        let object = ObjectRef::new();
        object.set("b", 1);
        object.set("a", 2);
        object.set("b", 3);
        assert_eq!(object.keys(), vec!["b", "a"]);
        assert_eq!(object.get("b"), Some(Value::from(3)));
    }

    #[test]
    fn object_remove_returns_value() {
        let object = ObjectRef::from_pairs([("x", 1)]);
        assert_eq!(object.remove("x"), Some(Value::from(1)));
        assert_eq!(object.remove("x"), None);
        assert!(object.is_empty());
    }

    #[test]
    fn cloned_handles_share_mutations() {
        let arr = ArrayRef::new(vec![]);
        let alias = arr.clone();
        alias.push("x");
        assert_eq!(arr.len(), 1);
        assert!(arr.contains(&Value::from("x")));
    }

    #[test]
    fn option_converts_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::from("x"));
    }

    #[test]
    fn dates_serialize_as_rfc3339() {
        let date = DateTime::parse_from_rfc3339("2024-01-15T14:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(Value::from(date).to_json(), json!("2024-01-15T14:30:00.000Z"));
    }
}
