//! # Instantiation
//!
//! Turning a descriptor plus caller overrides into a populated instance.
//!
//! For each attribute, **in declaration order**:
//!
//! 1. **Candidate**: the override if the overrides object has the key,
//!    otherwise the default. Either way it is copied per the attribute's
//!    [`CopyMode`](crate::CopyMode).
//! 2. **Evaluation**: if the copy is a function, it is called and its result
//!    replaces it. This is how per-instance defaults such as timestamps work.
//! 3. **Handlers**: the value runs through the attribute's handler chain; each
//!    handler gets the previous one's output.
//! 4. **Assignment**: the final value is set on the instance.
//!
//! Then every init handler runs, in registration order, with the instance and
//! the constructor's original arguments.
//!
//! ## Edge Cases
//!
//! - **Unknown overrides**: keys that are not declared attributes are ignored.
//!   They never reach an instance or a handler.
//! - **Non-object overrides**: anything that is not an object carries no
//!   overrides; all defaults apply.
//! - **Failures**: the first handler error aborts construction. Attributes
//!   assigned before it stay assigned; the instance is not rolled back.

use tracing::trace;

use super::{AttributeEntry, InitHandler};
use crate::error::Result;
use crate::model::Instance;
use crate::value::Value;

/// Resolve, transform and assign every attribute in `attributes` on `target`.
pub fn assign_attributes(
    attributes: &[AttributeEntry],
    target: &Instance,
    overrides: Option<&Value>,
) -> Result<()> {
    let overrides = overrides.and_then(Value::as_object);

    for entry in attributes {
        let value = resolve_value(entry, overrides.and_then(|o| o.get(entry.name())));
        let value = entry
            .handlers()
            .iter()
            .try_fold(value, |value, handler| handler.call(value, target, entry))?;

        trace!(attr = entry.name(), kind = value.type_name(), "attribute assigned");
        target.set(entry.name(), value);
    }

    Ok(())
}

/// Candidate value for one attribute: copy first, then evaluate functions.
fn resolve_value(entry: &AttributeEntry, override_value: Option<Value>) -> Value {
    let source = override_value.as_ref().unwrap_or(&entry.default_value);
    match entry.copy_mode.apply(source) {
        Value::Function(f) => f.call(),
        other => other,
    }
}

pub fn run_initializers(handlers: &[InitHandler], target: &Instance, args: &[Value]) -> Result<()> {
    for handler in handlers {
        handler.call(target, args)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::AttrHandler;
    use crate::error::KeylimeError;
    use crate::value::{CopyMode, ObjectRef};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn entry(name: &str, default: impl Into<Value>) -> AttributeEntry {
        AttributeEntry::new(name, default)
    }

    #[test]
    fn handler_chain_runs_in_order() {
        let attrs = vec![entry("a", 3)
            .with_handler(AttrHandler::new(|v, _, _| {
                Ok(Value::from(v.as_f64().unwrap_or(0.0) + 1.0))
            }))
            .with_handler(AttrHandler::new(|v, _, _| {
                Ok(Value::from(v.as_f64().unwrap_or(0.0) * 2.0))
            }))];
        let target = ObjectRef::new();
        assign_attributes(&attrs, &target, None).unwrap();
        assert_eq!(target.get("a"), Some(Value::from(8)));
    }

    #[test]
    fn unknown_overrides_are_ignored() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let overrides = Value::object([(
            "custom",
            Value::function(move || {
                counter.set(counter.get() + 1);
                Value::from(true)
            }),
        )]);
        let target = ObjectRef::new();
        assign_attributes(&[], &target, Some(&overrides)).unwrap();
        assert!(!target.has("custom"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn function_defaults_are_evaluated_per_instance() {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let attrs = vec![entry(
            "custom",
            Value::function(move || {
                counter.set(counter.get() + 1);
                Value::from(true)
            }),
        )];

        let first = ObjectRef::new();
        let second = ObjectRef::new();
        assign_attributes(&attrs, &first, None).unwrap();
        assign_attributes(&attrs, &second, None).unwrap();
        assert_eq!(first.get("custom"), Some(Value::from(true)));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn function_overrides_are_evaluated() {
        let attrs = vec![entry("custom", Value::Null)];
        let overrides = Value::object([("custom", Value::function(|| Value::from("computed")))]);
        let target = ObjectRef::new();
        assign_attributes(&attrs, &target, Some(&overrides)).unwrap();
        assert_eq!(target.get("custom"), Some(Value::from("computed")));
    }

    #[test]
    fn overrides_are_copied_per_copy_mode() {
        let shared = Value::array(["x"]);
        let overrides = Value::object([("deep", shared.clone()), ("none", shared.clone())]);
        let attrs = vec![
            entry("deep", Value::Null),
            entry("none", Value::Null).with_copy_mode(CopyMode::None),
        ];
        let target = ObjectRef::new();
        assign_attributes(&attrs, &target, Some(&overrides)).unwrap();

        assert!(!target.get("deep").unwrap().same_as(&shared));
        assert!(target.get("none").unwrap().same_as(&shared));
    }

    #[test]
    fn handlers_see_earlier_siblings() {
        let attrs = vec![
            entry("first", "Ben"),
            entry("greeting", Value::Null).with_handler(AttrHandler::new(|_, target, _| {
                let first = target.get("first").unwrap_or_default();
                Ok(Value::from(format!("hello {}", first)))
            })),
        ];
        let target = ObjectRef::new();
        assign_attributes(&attrs, &target, None).unwrap();
        assert_eq!(target.get("greeting"), Some(Value::from("hello Ben")));
    }

    #[test]
    fn handler_receives_its_entry() {
        let attrs = vec![entry("power", 1).with_handler(AttrHandler::new(|_, _, entry| {
            Ok(Value::from(entry.name()))
        }))];
        let target = ObjectRef::new();
        assign_attributes(&attrs, &target, None).unwrap();
        assert_eq!(target.get("power"), Some(Value::from("power")));
    }

    #[test]
    fn failing_handler_leaves_earlier_attributes() {
        let attrs = vec![
            entry("a", 1),
            entry("b", 2).with_handler(AttrHandler::new(|_, _, _| {
                Err(KeylimeError::handler("b is cursed"))
            })),
            entry("c", 3),
        ];
        let target = ObjectRef::new();
        let err = assign_attributes(&attrs, &target, None).unwrap_err();
        assert_eq!(err, KeylimeError::Handler("b is cursed".into()));
        assert!(target.has("a"));
        assert!(!target.has("b"));
        assert!(!target.has("c"));
    }

    #[test]
    fn initializers_run_in_order_with_args() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2) = (log.clone(), log.clone());
        let handlers = vec![
            InitHandler::new(move |_, args| {
                l1.borrow_mut().push(format!("h1:{}", args.len()));
                Ok(())
            }),
            InitHandler::new(move |_, args| {
                l2.borrow_mut().push(format!("h2:{}", args.len()));
                Ok(())
            }),
        ];
        let target = ObjectRef::new();
        run_initializers(&handlers, &target, &[Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(*log.borrow(), vec!["h1:2", "h2:2"]);
    }
}
