//! # Keylime Architecture
//!
//! Keylime builds **model constructors** from declarations. A model is told,
//! once, which attributes its instances carry, how each default is copied, and
//! which handlers shape values on their way in. Creating an instance then
//! replays that recipe.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Factory (factory.rs, extensions.rs)                        │
//! │  - Creates named models, adapts custom bodies               │
//! │  - Owns the extension registry and settings                 │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Model (model.rs)                                           │
//! │  - Chainable surface: attr, on/off, method, include, ...    │
//! │  - Instantiation across the inheritance lineage             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Attributes (attributes/)                                   │
//! │  - Descriptor: ordered entries, handler chains, init hooks  │
//! │  - The instantiation algorithm                              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Values (value/)                                            │
//! │  - Dynamic values with shared containers                    │
//! │  - Copy modes and the cloner                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Principle: Declarations Are Shared, Instances Are Not
//!
//! Defaults live on the descriptor and are shared by every instance. The copy
//! mode decides how much of a default each instance gets to itself:
//! `Deep` (the default) gives it a private copy, `Shallow` a private top-level
//! container, `None` the very same value.
//!
//! Models are single-threaded (`Rc`-based). The extension registry is the one
//! piece that may be shared across threads.
//!
//! ## Module Overview
//!
//! - [`value`]: Dynamic values, copy modes and the cloner
//! - [`attributes`]: Descriptors, attribute entries and handlers
//! - [`model`]: The model surface and instances
//! - [`factory`]: Creating and adapting models
//! - [`extensions`]: The extension registry
//! - [`config`]: Factory settings
//! - [`util`]: Helpers (`extend`)
//! - [`error`]: Error types

pub mod attributes;
pub mod config;
pub mod error;
pub mod extensions;
pub mod factory;
pub mod model;
pub mod util;
pub mod value;

pub use attributes::{AttrHandler, AttrOptions, AttributeEntry, Descriptor, InitHandler};
pub use config::KeylimeConfig;
pub use error::{ErrorKind, KeylimeError, Result};
pub use extensions::{Extension, Registry};
pub use factory::Keylime;
pub use model::{AttrHelper, EventKind, Instance, Listener, Model};
pub use value::{clone_value, ArrayRef, CopyMode, ObjectRef, RegexValue, Thunk, Value};
