use tracing::debug;

use super::init::{assign_attributes, run_initializers};
use super::{remove_by_ref, AttrHandler, AttrOptions, AttributeEntry, InitHandler};
use crate::error::{KeylimeError, Result};
use crate::model::Instance;
use crate::value::{CopyMode, Value};

/// How to build an instance of one model.
///
/// Attributes are kept in declaration order; that order is the order in which
/// properties are assigned on new instances, so handlers reading sibling
/// properties see exactly the ones declared before them.
#[derive(Debug, Clone)]
pub struct Descriptor {
    owner: String,
    default_copy_mode: CopyMode,
    attributes: Vec<AttributeEntry>,
    initializers: Option<Vec<InitHandler>>,
}

impl Default for Descriptor {
    fn default() -> Self {
        Self::new("anonymous")
    }
}

impl Descriptor {
    /// Create an empty descriptor. `owner` names the model in error messages.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            default_copy_mode: CopyMode::default(),
            attributes: Vec::new(),
            initializers: None,
        }
    }

    /// Copy mode used for attributes declared without one.
    pub fn with_default_copy_mode(mut self, copy_mode: CopyMode) -> Self {
        self.default_copy_mode = copy_mode;
        self
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    // --- Attributes ---

    /// Declare (or redeclare) an attribute.
    ///
    /// Redeclaring a name replaces the previous entry wholesale, keeping its
    /// position. Pass [`Value::Null`] for "no default".
    pub fn set_attr(
        &mut self,
        name: &str,
        default_value: impl Into<Value>,
        options: AttrOptions,
    ) -> Result<&mut Self> {
        if name.is_empty() {
            return Err(KeylimeError::Validation(format!(
                "a non-empty 'name' is required to create an attribute on {}",
                self.owner
            )));
        }

        let mut entry = AttributeEntry::new(name, default_value)
            .with_copy_mode(options.copy_mode.unwrap_or(self.default_copy_mode));
        for handler in options.handlers {
            entry.push_handler(handler);
        }

        debug!(model = %self.owner, attr = name, copy_mode = %entry.copy_mode, "attribute declared");
        self.install(entry);
        Ok(self)
    }

    /// Insert a prepared entry as-is, replacing any entry with the same name.
    pub fn install(&mut self, entry: AttributeEntry) -> &mut Self {
        match self.attributes.iter_mut().find(|e| e.name() == entry.name()) {
            Some(slot) => *slot = entry,
            None => self.attributes.push(entry),
        }
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&AttributeEntry> {
        self.attributes.iter().find(|e| e.name() == name)
    }

    pub fn get_default_value_for(&self, name: &str) -> Option<&Value> {
        self.get_attr(name).map(|e| &e.default_value)
    }

    /// All attributes, in declaration order.
    pub fn attributes(&self) -> &[AttributeEntry] {
        &self.attributes
    }

    pub fn attr_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|e| e.name())
    }

    // --- Init handlers ---

    pub fn add_init_handler(&mut self, handler: InitHandler) -> &mut Self {
        self.initializers.get_or_insert_with(Vec::new).push(handler);
        self
    }

    pub fn remove_init_handler(&mut self, handler: &InitHandler) -> bool {
        remove_by_ref(&mut self.initializers, |h| h.ptr_eq(handler))
    }

    /// Drop every init handler, returning the removed ones.
    pub fn remove_all_init_handlers(&mut self) -> Vec<InitHandler> {
        self.initializers.take().unwrap_or_default()
    }

    pub fn init_handlers(&self) -> &[InitHandler] {
        self.initializers.as_deref().unwrap_or_default()
    }

    pub fn has_init_handlers(&self) -> bool {
        self.initializers.is_some()
    }

    // --- Attribute handlers ---

    pub fn add_attr_handler(&mut self, attr: &str, handler: AttrHandler) -> Result<&mut Self> {
        self.entry_mut(attr)?.push_handler(handler);
        Ok(self)
    }

    pub fn remove_attr_handler(&mut self, attr: &str, handler: &AttrHandler) -> Result<bool> {
        Ok(self.entry_mut(attr)?.remove_handler(handler))
    }

    /// Drop every handler of `attr`, returning the removed ones.
    pub fn remove_all_attr_handlers(&mut self, attr: &str) -> Result<Vec<AttrHandler>> {
        Ok(self.entry_mut(attr)?.take_handlers())
    }

    fn entry_mut(&mut self, attr: &str) -> Result<&mut AttributeEntry> {
        let owner = &self.owner;
        self.attributes
            .iter_mut()
            .find(|e| e.name() == attr)
            .ok_or_else(|| KeylimeError::AttrNotFound {
                model: owner.clone(),
                attr: attr.to_string(),
            })
    }

    // --- Instantiation ---

    /// Populate `target` from this descriptor.
    ///
    /// Init handlers receive `overrides` as their only argument (or none).
    pub fn init(&self, target: &Instance, overrides: Option<&Value>) -> Result<()> {
        let args: Vec<Value> = overrides.cloned().into_iter().collect();
        self.init_with_args(target, overrides, &args)
    }

    /// Populate `target`, forwarding `args` to the init handlers.
    ///
    /// A failing handler stops construction immediately; attributes assigned
    /// before the failure stay on `target`.
    pub fn init_with_args(
        &self,
        target: &Instance,
        overrides: Option<&Value>,
        args: &[Value],
    ) -> Result<()> {
        assign_attributes(&self.attributes, target, overrides)?;
        run_initializers(self.init_handlers(), target, args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::value::ObjectRef;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn noop_attr() -> AttrHandler {
        AttrHandler::new(|v, _, _| Ok(v))
    }

    #[test]
    fn init_assigns_defaults() {
        let mut descriptor = Descriptor::default();
        descriptor
            .set_attr("power", 100, AttrOptions::default())
            .unwrap();
        let target = ObjectRef::new();
        descriptor.init(&target, None).unwrap();
        assert_eq!(target.get("power"), Some(Value::from(100)));
    }

    #[test]
    fn init_prefers_overrides() {
        let mut descriptor = Descriptor::default();
        descriptor
            .set_attr("side", "dark", AttrOptions::default())
            .unwrap()
            .set_attr("power", 100, AttrOptions::default())
            .unwrap();
        let target = ObjectRef::new();
        let overrides = Value::object([("side", "light")]);
        descriptor.init(&target, Some(&overrides)).unwrap();

        assert_eq!(
            Value::from(target),
            Value::object([("side", Value::from("light")), ("power", Value::from(100))])
        );
    }

    #[test]
    fn set_attr_requires_a_name() {
        let mut descriptor = Descriptor::new("Droid");
        let err = descriptor
            .set_attr("", 1, AttrOptions::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains("Droid"));
    }

    #[test]
    fn set_attr_uses_configured_default_copy_mode() {
        let mut descriptor = Descriptor::default().with_default_copy_mode(CopyMode::None);
        descriptor.set_attr("a", 1, AttrOptions::default()).unwrap();
        descriptor
            .set_attr("b", 1, AttrOptions::new().copy_mode(CopyMode::Shallow))
            .unwrap();
        assert_eq!(descriptor.get_attr("a").unwrap().copy_mode, CopyMode::None);
        assert_eq!(descriptor.get_attr("b").unwrap().copy_mode, CopyMode::Shallow);
    }

    #[test]
    fn redeclaring_overwrites_in_place() {
        let mut descriptor = Descriptor::default();
        descriptor
            .set_attr("a", 1, AttrOptions::new().handler(noop_attr()))
            .unwrap()
            .set_attr("b", 2, AttrOptions::default())
            .unwrap()
            .set_attr("a", 3, AttrOptions::default())
            .unwrap();

        let names: Vec<_> = descriptor.attr_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        let a = descriptor.get_attr("a").unwrap();
        assert_eq!(a.default_value, Value::from(3));
        assert!(!a.has_handlers());
    }

    #[test]
    fn missing_default_is_null() {
        let mut descriptor = Descriptor::default();
        descriptor
            .set_attr("name", Value::Null, AttrOptions::default())
            .unwrap();
        assert_eq!(descriptor.get_default_value_for("name"), Some(&Value::Null));
        assert_eq!(descriptor.get_default_value_for("other"), None);
    }

    #[test]
    fn default_value_round_trips() {
        let tags = Value::array(["a", "b"]);
        let mut descriptor = Descriptor::default();
        descriptor
            .set_attr("tags", tags.clone(), AttrOptions::default())
            .unwrap();
        assert_eq!(descriptor.get_attr("tags").unwrap().default_value, tags);
    }

    #[test]
    fn init_handlers_collapse_when_emptied() {
        let mut descriptor = Descriptor::default();
        let h1 = InitHandler::new(|_, _| Ok(()));
        let h2 = InitHandler::new(|_, _| Ok(()));
        descriptor.add_init_handler(h1.clone()).add_init_handler(h2.clone());
        assert_eq!(descriptor.init_handlers().len(), 2);

        assert!(descriptor.remove_init_handler(&h1));
        assert!(!descriptor.remove_init_handler(&h1));
        assert!(descriptor.remove_init_handler(&h2));
        assert!(!descriptor.has_init_handlers());
    }

    #[test]
    fn remove_all_init_handlers_returns_removed() {
        let mut descriptor = Descriptor::default();
        descriptor
            .add_init_handler(InitHandler::new(|_, _| Ok(())))
            .add_init_handler(InitHandler::new(|_, _| Ok(())));
        assert_eq!(descriptor.remove_all_init_handlers().len(), 2);
        assert!(descriptor.remove_all_init_handlers().is_empty());
    }

    #[test]
    fn attr_handler_operations_require_the_attribute() {
        let mut descriptor = Descriptor::new("Droid");
        let handler = noop_attr();

        let err = descriptor.add_attr_handler("missing", handler.clone()).unwrap_err();
        assert_eq!(
            err,
            KeylimeError::AttrNotFound {
                model: "Droid".into(),
                attr: "missing".into()
            }
        );
        assert_eq!(
            descriptor.remove_attr_handler("missing", &handler).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            descriptor.remove_all_attr_handlers("missing").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn attr_handlers_add_and_remove() {
        let mut descriptor = Descriptor::default();
        descriptor.set_attr("a", 1, AttrOptions::default()).unwrap();
        let handler = noop_attr();
        descriptor.add_attr_handler("a", handler.clone()).unwrap();
        assert!(descriptor.get_attr("a").unwrap().has_handlers());

        assert!(descriptor.remove_attr_handler("a", &handler).unwrap());
        assert!(!descriptor.get_attr("a").unwrap().has_handlers());
        assert!(!descriptor.remove_attr_handler("a", &handler).unwrap());
    }

    #[test]
    fn init_forwards_overrides_to_init_handlers() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut descriptor = Descriptor::default();
        descriptor.add_init_handler(InitHandler::new(move |_, args| {
            sink.borrow_mut().push(args.len());
            Ok(())
        }));

        let target = ObjectRef::new();
        descriptor.init(&target, None).unwrap();
        descriptor
            .init(&target, Some(&Value::object([("a", 1)])))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1]);
    }
}
