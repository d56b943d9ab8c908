//! # Attribute System
//!
//! Every model carries a [`Descriptor`]: the ordered list of attributes each new
//! instance receives, plus the init handlers that run once those attributes are
//! in place.
//!
//! - **Entries**: [`AttributeEntry`] holds the name, default value, copy mode
//!   and handler chain of one attribute.
//! - **Handlers**: [`AttrHandler`] transforms an attribute's value on its way
//!   into an instance; handlers chain in registration order.
//! - **Init handlers**: [`InitHandler`] runs after all attributes are assigned
//!   and sees the constructor's arguments.
//! - **Instantiation**: see [`init`] for the algorithm.
//!
//! ## Usage
//!
//! ```
//! use keylime::attributes::{AttrOptions, Descriptor};
//! use keylime::{ObjectRef, Value};
//!
//! let mut descriptor = Descriptor::new("Droid");
//! descriptor
//!     .set_attr("side", "dark", AttrOptions::default())?
//!     .set_attr("power", 100, AttrOptions::default())?;
//!
//! let target = ObjectRef::new();
//! let overrides = Value::object([("side", "light")]);
//! descriptor.init(&target, Some(&overrides))?;
//!
//! assert_eq!(target.get("side"), Some(Value::from("light")));
//! assert_eq!(target.get("power"), Some(Value::from(100)));
//! # Ok::<(), keylime::KeylimeError>(())
//! ```

mod descriptor;
pub mod init;

use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::model::Instance;
use crate::value::{CopyMode, Value};

pub use descriptor::Descriptor;

type AttrFn = dyn Fn(Value, &Instance, &AttributeEntry) -> Result<Value>;
type InitFn = dyn Fn(&Instance, &[Value]) -> Result<()>;

/// A step in an attribute's value pipeline.
///
/// Receives the value produced so far, the instance under construction and the
/// attribute's entry; returns the value for the next handler. Cloning shares the
/// handler, and removal matches by that shared identity.
#[derive(Clone)]
pub struct AttrHandler(Rc<AttrFn>);

impl AttrHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, &Instance, &AttributeEntry) -> Result<Value> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, value: Value, target: &Instance, entry: &AttributeEntry) -> Result<Value> {
        (self.0)(value, target, entry)
    }

    pub fn ptr_eq(&self, other: &AttrHandler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for AttrHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttrHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Hook run after an instance's attributes are assigned.
///
/// Receives the instance and exactly the arguments the constructor was called
/// with.
#[derive(Clone)]
pub struct InitHandler(Rc<InitFn>);

impl InitHandler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<()> + 'static,
    {
        Self(Rc::new(f))
    }

    pub fn call(&self, target: &Instance, args: &[Value]) -> Result<()> {
        (self.0)(target, args)
    }

    pub fn ptr_eq(&self, other: &InitHandler) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for InitHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InitHandler({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

/// Metadata for a single attribute.
#[derive(Debug, Clone)]
pub struct AttributeEntry {
    name: String,

    /// Value used when no override is given. May be a function, which is
    /// evaluated per instance.
    pub default_value: Value,

    /// How the default (or override) is copied into each instance.
    pub copy_mode: CopyMode,

    /// `None` when no handler is registered.
    handlers: Option<Vec<AttrHandler>>,
}

impl AttributeEntry {
    pub fn new(name: impl Into<String>, default_value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default_value: default_value.into(),
            copy_mode: CopyMode::default(),
            handlers: None,
        }
    }

    pub fn with_copy_mode(mut self, copy_mode: CopyMode) -> Self {
        self.copy_mode = copy_mode;
        self
    }

    pub fn with_handler(mut self, handler: AttrHandler) -> Self {
        self.push_handler(handler);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handlers(&self) -> &[AttrHandler] {
        self.handlers.as_deref().unwrap_or_default()
    }

    pub fn has_handlers(&self) -> bool {
        self.handlers.is_some()
    }

    pub(crate) fn push_handler(&mut self, handler: AttrHandler) {
        self.handlers.get_or_insert_with(Vec::new).push(handler);
    }

    pub(crate) fn remove_handler(&mut self, handler: &AttrHandler) -> bool {
        remove_by_ref(&mut self.handlers, |h| h.ptr_eq(handler))
    }

    pub(crate) fn take_handlers(&mut self) -> Vec<AttrHandler> {
        self.handlers.take().unwrap_or_default()
    }
}

/// Options merged onto an attribute when it is declared.
#[derive(Debug, Clone, Default)]
pub struct AttrOptions {
    pub copy_mode: Option<CopyMode>,
    pub handlers: Vec<AttrHandler>,
}

impl AttrOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the copy mode (otherwise the descriptor's default applies).
    pub fn copy_mode(mut self, copy_mode: CopyMode) -> Self {
        self.copy_mode = Some(copy_mode);
        self
    }

    /// Seed the handler chain.
    pub fn handler(mut self, handler: AttrHandler) -> Self {
        self.handlers.push(handler);
        self
    }
}

/// Remove the first element matching `is_target`, collapsing the list to
/// `None` once it is empty.
pub(crate) fn remove_by_ref<T>(list: &mut Option<Vec<T>>, is_target: impl Fn(&T) -> bool) -> bool {
    let Some(items) = list.as_mut() else {
        return false;
    };
    let Some(pos) = items.iter().position(is_target) else {
        return false;
    };
    items.remove(pos);
    if items.is_empty() {
        *list = None;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_entry_defaults_to_deep_copy() {
        let entry = AttributeEntry::new("tags", Value::array(["a"]));
        assert_eq!(entry.name(), "tags");
        assert_eq!(entry.copy_mode, CopyMode::Deep);
        assert!(!entry.has_handlers());
        assert!(entry.handlers().is_empty());
    }

    #[test]
    fn removing_last_handler_collapses_list() {
        let handler = AttrHandler::new(|v, _, _| Ok(v));
        let mut entry = AttributeEntry::new("a", 1).with_handler(handler.clone());
        assert!(entry.has_handlers());

        assert!(entry.remove_handler(&handler));
        assert!(!entry.has_handlers());
        assert!(!entry.remove_handler(&handler));
    }

    #[test]
    fn removal_matches_by_reference() {
        let kept = AttrHandler::new(|v, _, _| Ok(v));
        let lookalike = AttrHandler::new(|v, _, _| Ok(v));
        let mut entry = AttributeEntry::new("a", 1).with_handler(kept.clone());

        assert!(!entry.remove_handler(&lookalike));
        assert_eq!(entry.handlers().len(), 1);
        assert!(entry.handlers()[0].ptr_eq(&kept));
    }

    #[test]
    fn take_handlers_empties_the_chain() {
        let mut entry = AttributeEntry::new("a", 1)
            .with_handler(AttrHandler::new(|v, _, _| Ok(v)))
            .with_handler(AttrHandler::new(|v, _, _| Ok(v)));
        assert_eq!(entry.take_handlers().len(), 2);
        assert!(!entry.has_handlers());
        assert!(entry.take_handlers().is_empty());
    }

    #[test]
    fn options_builder_collects_settings() {
        let options = AttrOptions::new()
            .copy_mode(CopyMode::Shallow)
            .handler(AttrHandler::new(|v, _, _| Ok(v)));
        assert_eq!(options.copy_mode, Some(CopyMode::Shallow));
        assert_eq!(options.handlers.len(), 1);
    }
}
