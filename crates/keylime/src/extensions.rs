//! # Extensions
//!
//! Named, reusable model behaviour. An extension is registered once on a
//! [`Registry`] and applied to a model on request:
//!
//! ```
//! use keylime::{Keylime, Registry, Value};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(Registry::new());
//! registry.register("timestamps", |model, _| {
//!     model.attr("created", Value::function(|| Value::from(chrono::Utc::now())))?;
//!     Ok(())
//! })?;
//!
//! let keylime = Keylime::new(registry, Default::default());
//! let note = keylime.create_named("Note")?;
//! note.invoke("timestamps", &[])?;
//! assert!(note.get_attr("created").is_some());
//! # Ok::<(), keylime::KeylimeError>(())
//! ```
//!
//! Registration is the only way an extension reaches a model: nothing is
//! grafted onto models that did not ask for it, and a name may not shadow a
//! built-in verb or an earlier registration.
//!
//! The process-wide registry ([`Registry::global`]) backs [`Keylime::default`](crate::Keylime).
//! Tests and embedders that want isolation create their own.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{KeylimeError, Result};
use crate::model::{Model, SURFACE_VERBS};
use crate::value::Value;

type ExtensionFn = dyn Fn(&Model, &[Value]) -> Result<()> + Send + Sync;

/// A registered extension. Receives the model and the invocation arguments.
#[derive(Clone)]
pub struct Extension(Arc<ExtensionFn>);

impl Extension {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Model, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, model: &Model, args: &[Value]) -> Result<()> {
        (self.0)(model, args)
    }

    pub fn ptr_eq(&self, other: &Extension) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Extension({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

#[derive(Debug, Default)]
pub struct Registry {
    extensions: Mutex<BTreeMap<String, Extension>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Registry> {
        Arc::clone(&GLOBAL)
    }

    /// Register `f` under `name`.
    ///
    /// Fails with a conflict if `name` is a built-in verb or already taken.
    pub fn register<F>(&self, name: &str, f: F) -> Result<Extension>
    where
        F: Fn(&Model, &[Value]) -> Result<()> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(KeylimeError::Validation(
                "an extension needs a non-empty name".to_string(),
            ));
        }
        if SURFACE_VERBS.contains(&name) {
            return Err(KeylimeError::Conflict(name.to_string()));
        }

        let mut extensions = self.lock();
        if extensions.contains_key(name) {
            return Err(KeylimeError::Conflict(name.to_string()));
        }
        let extension = Extension::new(f);
        extensions.insert(name.to_string(), extension.clone());
        debug!(extension = name, "extension registered");
        Ok(extension)
    }

    pub fn unregister(&self, name: &str) -> bool {
        let removed = self.lock().remove(name).is_some();
        if removed {
            debug!(extension = name, "extension unregistered");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Extension> {
        self.lock().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// A copy of the whole table. Later registrations do not show up in it.
    pub fn snapshot(&self) -> BTreeMap<String, Extension> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Extension>> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        self.extensions.lock().unwrap_or_else(|e| e.into_inner())
    }
}
