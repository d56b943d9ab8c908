//! # Model Factory
//!
//! [`Keylime`] creates models. Every model it creates shares the factory's
//! extension [`Registry`] and [`KeylimeConfig`].
//!
//! - [`Keylime::create_named`] builds a model with the default constructor body.
//! - [`Keylime::adapt`] wraps a hand-written body and pre-seeds attributes, for
//!   types that need their own construction logic but still want declared
//!   attributes (the body calls [`Model::init`] when it is ready).

use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::attributes::AttributeEntry;
use crate::config::KeylimeConfig;
use crate::error::{KeylimeError, Result};
use crate::extensions::Registry;
use crate::model::{Body, Instance, Model};
use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Keylime {
    registry: Arc<Registry>,
    config: KeylimeConfig,
}

impl Default for Keylime {
    /// A factory backed by the process-wide registry and default settings.
    fn default() -> Self {
        Self::new(Registry::global(), KeylimeConfig::default())
    }
}

impl Keylime {
    pub fn new(registry: Arc<Registry>, config: KeylimeConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &KeylimeConfig {
        &self.config
    }

    /// Create a model named `name` with the default constructor body.
    pub fn create_named(&self, name: &str) -> Result<Model> {
        validate_model_name(name)?;
        debug!(model = name, "model created");
        Ok(Model::new(name, None, Arc::clone(&self.registry), &self.config))
    }

    /// Create a model around a custom constructor body.
    ///
    /// `initial_attrs` are installed as given, keeping their copy modes and
    /// handlers. The factory's `default_copy_mode` only applies to attributes
    /// declared later through [`Model::attr`]; set `copy_mode` on an entry to
    /// change how it is copied. The body owns construction: attributes are
    /// only assigned when it calls [`Model::init`].
    pub fn adapt<F>(&self, name: &str, body: F, initial_attrs: Vec<AttributeEntry>) -> Result<Model>
    where
        F: Fn(&Model, &Instance, &[Value]) -> Result<()> + 'static,
    {
        validate_model_name(name)?;
        let model = Model::new(
            name,
            Some(Rc::new(body) as Body),
            Arc::clone(&self.registry),
            &self.config,
        );
        {
            let mut descriptor = model.descriptor_mut()?;
            for entry in initial_attrs {
                descriptor.install(entry);
            }
        }
        debug!(model = name, attrs = model.get_attrs().len(), "model adapted");
        Ok(model)
    }
}

/// Model names follow identifier rules: a letter, `_` or `$`, then letters,
/// digits, `_` or `$`.
fn validate_model_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' || first == '$' => {
            chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(KeylimeError::Validation(format!(
            "'{}' is not a valid model name",
            name
        )))
    }
}
