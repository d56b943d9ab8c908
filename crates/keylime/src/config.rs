//! # Configuration
//!
//! Factory-wide settings, loaded with [`confique`] from (in priority order):
//!
//! 1. **Environment variables**: `KEYLIME_DEFAULT_COPY_MODE`, `KEYLIME_STRICT_EVENTS`.
//! 2. **Config file**: a TOML file passed to [`KeylimeConfig::load`]. A missing
//!    file is skipped.
//! 3. **Compiled defaults**: via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `default_copy_mode` | `deep` | Copy mode for attributes declared without one |
//! | `strict_events` | `false` | Reject unknown event names in `on`/`off` |

use std::path::Path;

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::error::{KeylimeError, Result};
use crate::value::CopyMode;

/// Settings applied to every model a factory creates.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KeylimeConfig {
    /// Copy mode for attributes declared without one ("none", "shallow", "deep").
    #[config(default = "deep", env = "KEYLIME_DEFAULT_COPY_MODE")]
    pub default_copy_mode: CopyMode,

    /// When set, `on`/`off` fail on event names other than "init" and "attr".
    #[config(default = false, env = "KEYLIME_STRICT_EVENTS")]
    pub strict_events: bool,
}

impl Default for KeylimeConfig {
    fn default() -> Self {
        Self {
            default_copy_mode: CopyMode::Deep,
            strict_events: false,
        }
    }
}

impl KeylimeConfig {
    /// Resolve the configuration from the environment and, optionally, a file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = path {
            builder = builder.file(path);
        }
        builder
            .load()
            .map_err(|e| KeylimeError::Config(e.to_string()))
    }
}
