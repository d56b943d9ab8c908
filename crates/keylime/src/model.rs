//! # Models
//!
//! A [`Model`] is a named constructor. It owns one [`Descriptor`], a table of
//! shared instance behaviour (methods), an optional parent model and the body
//! that runs when an instance is created. Everything on it is chainable:
//!
//! ```
//! use keylime::{Keylime, Listener, Registry, Value};
//! use std::sync::Arc;
//!
//! let keylime = Keylime::new(Arc::new(Registry::new()), Default::default());
//! let post = keylime.create_named("Post")?;
//! post.attr("title", "")?
//!     .attr("tags", Value::array(Vec::<Value>::new()))?
//!     .on("attr", Listener::attr("title", |v, _, _| Ok(Value::from(v.to_string().trim().to_string()))))?;
//!
//! let instance = post.create(&[Value::object([("title", "  Hello  ")])])?;
//! assert_eq!(instance.get("title"), Some(Value::from("Hello")));
//! assert!(instance.is_instance_of(&post));
//! # Ok::<(), keylime::KeylimeError>(())
//! ```
//!
//! ## Events
//!
//! `on`/`off`/`off_any` dispatch on an event name:
//!
//! | Event | `on` | `off` | `off_any` |
//! |-------|------|-------|-----------|
//! | `init` | add init handler | remove that handler | remove all init handlers |
//! | `attr` | add handler to an attribute | remove that handler | remove all handlers of the attribute |
//!
//! Unknown event names are ignored unless the model was created with
//! `strict_events`, in which case they are rejected.
//!
//! ## Inheritance
//!
//! A model may inherit from one parent. Instantiation assigns the attributes
//! of every level root-first, then runs the init handlers of every level
//! root-first, so each init handler sees the fully populated instance. Method
//! lookup walks the lineage child-first.
//!
//! ## Attribute Helpers
//!
//! [`Model::attr_helper`] registers a named step that decorates the most
//! recently declared attribute:
//!
//! ```
//! use keylime::{AttrOptions, CopyMode, Keylime, Registry, Value};
//! use std::sync::Arc;
//!
//! let keylime = Keylime::new(Arc::new(Registry::new()), Default::default());
//! let user = keylime.create_named("User")?;
//! user.attr_helper("shared", |model, entry, _| {
//!     let options = AttrOptions::new().copy_mode(CopyMode::None);
//!     model.attr_with(entry.name(), entry.default_value.clone(), options)?;
//!     Ok(())
//! })?;
//!
//! user.attr("roles", Value::array(["admin"]))?
//!     .call_attr_helper("shared", &[])?;
//! assert_eq!(user.get_attr("roles").unwrap().copy_mode, CopyMode::None);
//! # Ok::<(), keylime::KeylimeError>(())
//! ```
//!
//! ## Lifetime of Changes
//!
//! Configuration may change at any time. Instances are never updated
//! retroactively: each instantiation works from a snapshot of the lineage's
//! descriptors taken as it starts, so even handlers that reconfigure the model
//! mid-construction only affect later instances.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::attributes::init::{assign_attributes, run_initializers};
use crate::attributes::{AttrHandler, AttrOptions, AttributeEntry, Descriptor, InitHandler};
use crate::config::KeylimeConfig;
use crate::error::{KeylimeError, Result};
use crate::extensions::Registry;
use crate::value::{ObjectRef, Value};

/// A model instance: an object linked to the model that built it.
pub type Instance = ObjectRef;

/// Shared instance behaviour, called through [`Instance::call`].
pub type Method = Rc<dyn Fn(&Instance, &[Value]) -> Result<Value>>;

/// Behaviour attached to the model itself, called through [`Model::call_class`].
pub type ClassMethod = Rc<dyn Fn(&Model, &[Value]) -> Result<Value>>;

/// Constructor body. Custom bodies are responsible for calling [`Model::init`].
pub type Body = Rc<dyn Fn(&Model, &Instance, &[Value]) -> Result<()>>;

/// Decorates the last declared attribute, called through [`Model::call_attr_helper`].
pub type AttrHelper = Rc<dyn Fn(&Model, &AttributeEntry, &[Value]) -> Result<()>>;

/// Names of the built-in verbs. Extensions may not reuse them.
pub const SURFACE_VERBS: &[&str] = &[
    "attr",
    "attr_helper",
    "attr_with",
    "call_attr_helper",
    "call_class",
    "class_method",
    "create",
    "descriptor",
    "get_attr",
    "get_attrs",
    "id",
    "include",
    "inherits",
    "init",
    "invoke",
    "method",
    "name",
    "off",
    "off_any",
    "on",
    "parent",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Init,
    Attr,
}

impl FromStr for EventKind {
    type Err = KeylimeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "init" => Ok(EventKind::Init),
            "attr" => Ok(EventKind::Attr),
            other => Err(KeylimeError::Validation(format!(
                "unknown event '{}' (expected 'init' or 'attr')",
                other
            ))),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Init => write!(f, "init"),
            EventKind::Attr => write!(f, "attr"),
        }
    }
}

/// A handler subscribed through [`Model::on`].
///
/// Keep a clone around to unsubscribe it later with [`Model::off`].
#[derive(Debug, Clone)]
pub enum Listener {
    Init(InitHandler),
    Attr { attr: String, handler: AttrHandler },
}

impl Listener {
    pub fn init<F>(f: F) -> Self
    where
        F: Fn(&Instance, &[Value]) -> Result<()> + 'static,
    {
        Listener::Init(InitHandler::new(f))
    }

    pub fn attr<F>(attr: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value, &Instance, &AttributeEntry) -> Result<Value> + 'static,
    {
        Listener::Attr {
            attr: attr.into(),
            handler: AttrHandler::new(f),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Listener::Init(_) => EventKind::Init,
            Listener::Attr { .. } => EventKind::Attr,
        }
    }
}

struct ModelInner {
    id: Uuid,
    name: String,
    descriptor: RefCell<Descriptor>,
    methods: RefCell<Vec<(String, Method)>>,
    class_methods: RefCell<Vec<(String, ClassMethod)>>,
    attr_helpers: RefCell<Vec<(String, AttrHelper)>>,
    last_attr: RefCell<Option<String>>,
    parent: RefCell<Option<Model>>,
    body: Option<Body>,
    registry: Arc<Registry>,
    strict_events: bool,
}

/// A named constructor. Cloning yields another handle to the same model.
#[derive(Clone)]
pub struct Model(Rc<ModelInner>);

impl Model {
    pub(crate) fn new(
        name: &str,
        body: Option<Body>,
        registry: Arc<Registry>,
        config: &KeylimeConfig,
    ) -> Self {
        let descriptor = Descriptor::new(name).with_default_copy_mode(config.default_copy_mode);
        Self(Rc::new(ModelInner {
            id: Uuid::new_v4(),
            name: name.to_string(),
            descriptor: RefCell::new(descriptor),
            methods: RefCell::new(Vec::new()),
            class_methods: RefCell::new(Vec::new()),
            attr_helpers: RefCell::new(Vec::new()),
            last_attr: RefCell::new(None),
            parent: RefCell::new(None),
            body,
            registry,
            strict_events: config.strict_events,
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn id(&self) -> Uuid {
        self.0.id
    }

    pub fn ptr_eq(&self, other: &Model) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.0.registry
    }

    // --- Attributes ---

    /// Declare an attribute with the model's default copy mode.
    pub fn attr(&self, name: &str, default_value: impl Into<Value>) -> Result<&Self> {
        self.attr_with(name, default_value, AttrOptions::default())
    }

    pub fn attr_with(
        &self,
        name: &str,
        default_value: impl Into<Value>,
        options: AttrOptions,
    ) -> Result<&Self> {
        self.descriptor_mut()?.set_attr(name, default_value, options)?;
        *self.0.last_attr.borrow_mut() = Some(name.to_string());
        Ok(self)
    }

    /// Register `f` as the attribute helper `name`. It does not run until
    /// [`Model::call_attr_helper`] is called.
    pub fn attr_helper<F>(&self, name: &str, f: F) -> Result<&Self>
    where
        F: Fn(&Model, &AttributeEntry, &[Value]) -> Result<()> + 'static,
    {
        self.check_member_name(name, "helper")?;
        if SURFACE_VERBS.contains(&name) {
            return Err(KeylimeError::Conflict(name.to_string()));
        }
        upsert(&mut self.0.attr_helpers.borrow_mut(), name, Rc::new(f) as AttrHelper);
        Ok(self)
    }

    pub fn has_attr_helper(&self, name: &str) -> bool {
        lookup(&self.0.attr_helpers.borrow(), name).is_some()
    }

    /// Run the attribute helper `name` against the last declared attribute.
    ///
    /// `f` receives the model, a copy of that attribute's entry and `args`.
    pub fn call_attr_helper(&self, name: &str, args: &[Value]) -> Result<&Self> {
        let helper = lookup(&self.0.attr_helpers.borrow(), name).ok_or_else(|| {
            KeylimeError::MethodNotFound {
                model: self.name().to_string(),
                method: name.to_string(),
            }
        })?;
        let last = self.0.last_attr.borrow().clone().ok_or_else(|| {
            KeylimeError::Validation(format!(
                "declare an attribute on {} before calling the '{}' attribute helper",
                self.name(),
                name
            ))
        })?;
        let entry = self.get_attr(&last).ok_or_else(|| KeylimeError::AttrNotFound {
            model: self.name().to_string(),
            attr: last.clone(),
        })?;
        debug!(model = %self.name(), helper = name, attr = %last, "running attribute helper");
        helper(self, &entry, args)?;
        Ok(self)
    }

    /// Live view of the declared attributes.
    ///
    /// Release the view before reconfiguring the model; configuration calls
    /// made while it is held fail with a validation error.
    pub fn get_attrs(&self) -> Ref<'_, [AttributeEntry]> {
        Ref::map(self.0.descriptor.borrow(), |d| d.attributes())
    }

    pub fn get_attr(&self, name: &str) -> Option<AttributeEntry> {
        self.0.descriptor.borrow().get_attr(name).cloned()
    }

    pub fn descriptor(&self) -> Ref<'_, Descriptor> {
        self.0.descriptor.borrow()
    }

    pub(crate) fn descriptor_mut(&self) -> Result<RefMut<'_, Descriptor>> {
        self.0.descriptor.try_borrow_mut().map_err(|_| {
            KeylimeError::Validation(format!(
                "{} is being inspected; release attribute views before reconfiguring it",
                self.name()
            ))
        })
    }

    // --- Behaviour ---

    /// Add (or replace) a method shared by all instances.
    pub fn method<F>(&self, name: &str, f: F) -> Result<&Self>
    where
        F: Fn(&Instance, &[Value]) -> Result<Value> + 'static,
    {
        self.check_member_name(name, "method")?;
        upsert(&mut self.0.methods.borrow_mut(), name, Rc::new(f) as Method);
        Ok(self)
    }

    /// Add (or replace) a method on the model itself.
    pub fn class_method<F>(&self, name: &str, f: F) -> Result<&Self>
    where
        F: Fn(&Model, &[Value]) -> Result<Value> + 'static,
    {
        self.check_member_name(name, "class method")?;
        upsert(&mut self.0.class_methods.borrow_mut(), name, Rc::new(f) as ClassMethod);
        Ok(self)
    }

    pub fn call_class(&self, name: &str, args: &[Value]) -> Result<Value> {
        let found = self.lineage().into_iter().rev().find_map(|level| {
            lookup(&level.0.class_methods.borrow(), name)
        });
        match found {
            Some(f) => f(self, args),
            None => Err(KeylimeError::MethodNotFound {
                model: self.name().to_string(),
                method: name.to_string(),
            }),
        }
    }

    pub(crate) fn find_method(&self, name: &str) -> Option<Method> {
        self.lineage()
            .into_iter()
            .rev()
            .find_map(|level| lookup(&level.0.methods.borrow(), name))
    }

    /// Run `mixin` against this model right away.
    pub fn include<F>(&self, mixin: F, extra_args: &[Value]) -> Result<&Self>
    where
        F: FnOnce(&Model, &[Value]) -> Result<()>,
    {
        mixin(self, extra_args)?;
        Ok(self)
    }

    /// Run the registered extension `name` against this model.
    pub fn invoke(&self, name: &str, args: &[Value]) -> Result<&Self> {
        let extension = self
            .0
            .registry
            .get(name)
            .ok_or_else(|| KeylimeError::ExtensionNotFound(name.to_string()))?;
        debug!(model = %self.name(), extension = name, "invoking extension");
        extension.call(self, args)?;
        Ok(self)
    }

    fn check_member_name(&self, name: &str, what: &str) -> Result<()> {
        if name.is_empty() {
            return Err(KeylimeError::Validation(format!(
                "you must supply a name to add a {} on {}",
                what,
                self.name()
            )));
        }
        Ok(())
    }

    // --- Inheritance ---

    /// Make `parent` the parent of this model.
    pub fn inherits(&self, parent: &Model) -> Result<&Self> {
        if parent.lineage().iter().any(|m| m.ptr_eq(self)) {
            return Err(KeylimeError::Validation(format!(
                "{} cannot inherit from {}: the lineage would be cyclic",
                self.name(),
                parent.name()
            )));
        }
        debug!(model = %self.name(), parent = %parent.name(), "inheritance set");
        *self.0.parent.borrow_mut() = Some(parent.clone());
        Ok(self)
    }

    pub fn parent(&self) -> Option<Model> {
        self.0.parent.borrow().clone()
    }

    /// This model and its ancestors, root first.
    fn lineage(&self) -> Vec<Model> {
        let mut chain = vec![self.clone()];
        while let Some(parent) = chain.last().and_then(Model::parent) {
            chain.push(parent);
        }
        chain.reverse();
        chain
    }

    // --- Events ---

    pub fn on(&self, event: &str, listener: Listener) -> Result<&Self> {
        let Some(kind) = self.event_kind(event)? else {
            return Ok(self);
        };
        self.check_listener(kind, &listener)?;

        let mut descriptor = self.descriptor_mut()?;
        match listener {
            Listener::Init(handler) => {
                descriptor.add_init_handler(handler);
            }
            Listener::Attr { attr, handler } => {
                descriptor.add_attr_handler(&attr, handler)?;
            }
        }
        Ok(self)
    }

    pub fn off(&self, event: &str, listener: &Listener) -> Result<&Self> {
        let Some(kind) = self.event_kind(event)? else {
            return Ok(self);
        };
        self.check_listener(kind, listener)?;

        let mut descriptor = self.descriptor_mut()?;
        let removed = match listener {
            Listener::Init(handler) => descriptor.remove_init_handler(handler),
            Listener::Attr { attr, handler } => descriptor.remove_attr_handler(attr, handler)?,
        };
        debug!(model = %self.name(), event, removed, "listener unsubscribed");
        Ok(self)
    }

    /// Remove every listener of an event. `attr` is required for `attr`.
    pub fn off_any(&self, event: &str, attr: Option<&str>) -> Result<&Self> {
        let Some(kind) = self.event_kind(event)? else {
            return Ok(self);
        };

        let mut descriptor = self.descriptor_mut()?;
        let removed = match (kind, attr) {
            (EventKind::Init, _) => descriptor.remove_all_init_handlers().len(),
            (EventKind::Attr, Some(attr)) => descriptor.remove_all_attr_handlers(attr)?.len(),
            (EventKind::Attr, None) => {
                return Err(KeylimeError::Validation(format!(
                    "an attribute name is required to remove 'attr' listeners on {}",
                    self.name()
                )))
            }
        };
        debug!(model = %self.name(), event, removed, "listeners cleared");
        Ok(self)
    }

    fn event_kind(&self, event: &str) -> Result<Option<EventKind>> {
        match event.parse::<EventKind>() {
            Ok(kind) => Ok(Some(kind)),
            Err(err) if self.0.strict_events => Err(err),
            Err(_) => {
                debug!(model = %self.name(), event, "ignoring unknown event");
                Ok(None)
            }
        }
    }

    fn check_listener(&self, kind: EventKind, listener: &Listener) -> Result<()> {
        if listener.kind() != kind {
            return Err(KeylimeError::Validation(format!(
                "a '{}' listener cannot subscribe to the '{}' event on {}",
                listener.kind(),
                kind,
                self.name()
            )));
        }
        Ok(())
    }

    // --- Instantiation ---

    /// Allocate an instance and run the constructor body with `args`.
    ///
    /// The default body uses the first argument as overrides when it is an
    /// object and forwards all arguments to init handlers.
    pub fn create(&self, args: &[Value]) -> Result<Instance> {
        let instance = Instance::with_model(self.clone());
        debug!(model = %self.name(), args = args.len(), "creating instance");
        match &self.0.body {
            Some(body) => body(self, &instance, args)?,
            None => self.init(&instance, args.first(), args)?,
        }
        Ok(instance)
    }

    /// Populate `target` from the whole lineage, root first.
    ///
    /// Every level's attributes are assigned before any init handler runs.
    pub fn init(&self, target: &Instance, overrides: Option<&Value>, args: &[Value]) -> Result<()> {
        let levels = self
            .lineage()
            .iter()
            .map(Model::snapshot)
            .collect::<Result<Vec<_>>>()?;
        for level in &levels {
            assign_attributes(level.attributes(), target, overrides)?;
        }
        for level in &levels {
            run_initializers(level.init_handlers(), target, args)?;
        }
        Ok(())
    }

    fn snapshot(&self) -> Result<Descriptor> {
        self.0
            .descriptor
            .try_borrow()
            .map(|d| d.clone())
            .map_err(|_| {
                KeylimeError::Validation(format!("{} is being reconfigured", self.name()))
            })
    }
}

fn upsert<T>(table: &mut Vec<(String, T)>, name: &str, item: T) {
    match table.iter_mut().find(|(n, _)| n == name) {
        Some((_, slot)) => *slot = item,
        None => table.push((name.to_string(), item)),
    }
}

fn lookup<T: Clone>(table: &[(String, T)], name: &str) -> Option<T> {
    table.iter().find(|(n, _)| n == name).map(|(_, item)| item.clone())
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("name", &self.0.name)
            .field("id", &self.0.id)
            .finish()
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.name)
    }
}

impl ObjectRef {
    /// Call a method defined on this instance's model (or an ancestor).
    pub fn call(&self, method: &str, args: &[Value]) -> Result<Value> {
        let model = self.model();
        let found = model.as_ref().and_then(|m| m.find_method(method));
        match found {
            Some(f) => f(self, args),
            None => Err(KeylimeError::MethodNotFound {
                model: model.map_or_else(|| "Object".to_string(), |m| m.name().to_string()),
                method: method.to_string(),
            }),
        }
    }

    /// Whether this object was built by `model` or one of its descendants.
    pub fn is_instance_of(&self, model: &Model) -> bool {
        self.model()
            .is_some_and(|m| m.lineage().iter().any(|level| level.ptr_eq(model)))
    }
}
