use thiserror::Error;

/// Coarse classification of a [`KeylimeError`].
///
/// Callers that only care about *what kind* of misuse happened (bad argument,
/// missing attribute, duplicate extension) can match on this instead of the
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Handler,
    Config,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KeylimeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Attribute not found: '{attr}' is not declared on {model}")]
    AttrNotFound { model: String, attr: String },

    #[error("Method not found: '{method}' is not defined on {model}")]
    MethodNotFound { model: String, method: String },

    #[error("Extension not found: '{0}' is not registered")]
    ExtensionNotFound(String),

    #[error("Conflict: '{0}' is already defined")]
    Conflict(String),

    #[error("Handler error: {0}")]
    Handler(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl KeylimeError {
    /// Shorthand for user handlers that want to abort an instantiation.
    pub fn handler(message: impl Into<String>) -> Self {
        KeylimeError::Handler(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            KeylimeError::Validation(_) => ErrorKind::Validation,
            KeylimeError::AttrNotFound { .. }
            | KeylimeError::MethodNotFound { .. }
            | KeylimeError::ExtensionNotFound(_) => ErrorKind::NotFound,
            KeylimeError::Conflict(_) => ErrorKind::Conflict,
            KeylimeError::Handler(_) => ErrorKind::Handler,
            KeylimeError::Config(_) => ErrorKind::Config,
        }
    }
}

pub type Result<T> = std::result::Result<T, KeylimeError>;
