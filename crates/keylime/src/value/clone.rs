//! Value copying.
//!
//! Defaults live on the descriptor and are shared by every instance a model
//! builds. Copying them on the way into an instance keeps one instance's
//! mutations from leaking into the next; [`CopyMode`] picks how far down the
//! copy goes.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{ArrayRef, Object, ObjectRef, Value};
use crate::error::KeylimeError;

/// How an attribute's value is copied into each new instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMode {
    /// Share the stored value by reference.
    None,
    /// New top-level container, elements shared.
    Shallow,
    /// Recursive copy.
    #[default]
    Deep,
}

impl CopyMode {
    pub fn apply(self, value: &Value) -> Value {
        match self {
            CopyMode::None => value.clone(),
            CopyMode::Shallow => clone_value(value, false),
            CopyMode::Deep => clone_value(value, true),
        }
    }
}

impl fmt::Display for CopyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CopyMode::None => "none",
            CopyMode::Shallow => "shallow",
            CopyMode::Deep => "deep",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CopyMode {
    type Err = KeylimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CopyMode::None),
            "shallow" => Ok(CopyMode::Shallow),
            "deep" => Ok(CopyMode::Deep),
            other => Err(KeylimeError::Validation(format!(
                "unknown copy mode '{}' (expected none, shallow or deep)",
                other
            ))),
        }
    }
}

/// Copy a value.
///
/// - Scalars, dates and regexes come back as equal values.
/// - Arrays and plain objects always get a new container; with `deep` every
///   element is copied recursively, otherwise elements are shared.
/// - Objects linked to a model get a new object of the same model with their
///   own properties copied one level, regardless of `deep`.
/// - Functions pass through untouched.
///
/// A deep copy keeps the shape of the source graph: a container reached
/// twice is copied once, and cycles point back into the copy.
pub fn clone_value(value: &Value, deep: bool) -> Value {
    if deep {
        return deep_clone(value, &mut HashMap::new());
    }
    match value {
        Value::Array(items) => Value::Array(ArrayRef::new(items.borrow().clone())),
        Value::Object(object) => {
            let source = object.borrow();
            Value::Object(ObjectRef::from_object(Object {
                model: source.model.clone(),
                props: source.props.clone(),
            }))
        }
        other => other.clone(),
    }
}

/// Copies already made, keyed by the address of their source container.
type Seen = HashMap<*const (), Value>;

fn deep_clone(value: &Value, seen: &mut Seen) -> Value {
    match value {
        Value::Array(items) => {
            let key = Rc::as_ptr(&items.0) as *const ();
            if let Some(copy) = seen.get(&key) {
                return copy.clone();
            }
            let copy = ArrayRef::new(Vec::new());
            seen.insert(key, Value::Array(copy.clone()));
            let copied = items
                .borrow()
                .iter()
                .map(|item| deep_clone(item, seen))
                .collect();
            *copy.0.borrow_mut() = copied;
            Value::Array(copy)
        }
        Value::Object(object) => {
            let key = Rc::as_ptr(&object.0) as *const ();
            if let Some(copy) = seen.get(&key) {
                return copy.clone();
            }
            let source = object.borrow();
            let copy = ObjectRef::from_object(Object {
                model: source.model.clone(),
                props: Vec::new(),
            });
            seen.insert(key, Value::Object(copy.clone()));
            let props = if source.model.is_some() {
                source.props.clone()
            } else {
                source
                    .props
                    .iter()
                    .map(|(k, v)| (k.clone(), deep_clone(v, seen)))
                    .collect()
            };
            copy.0.borrow_mut().props = props;
            Value::Object(copy)
        }
        other => other.clone(),
    }
}
