//! Error types for the reactive runtime and store layer.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Main error type for store and runtime operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store `{0}` has no state factory")]
    MissingState(String),

    #[error("state factory of store `{store}` returned {found}, expected an object")]
    InvalidState { store: String, found: &'static str },

    #[error("setup of store `{store}` failed: {source}")]
    Setup {
        store: String,
        #[source]
        source: ActionError,
    },

    #[error("store `{store}` has no property `{name}`")]
    UnknownProperty { store: String, name: String },

    #[error("store `{store}` has no action `{name}`")]
    UnknownAction { store: String, name: String },

    #[error("property `{name}` of store `{store}` is read-only")]
    ReadOnly { store: String, name: String },

    #[error("store `{0}` is built with a setup function and cannot be reset")]
    ResetUnsupported(String),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error("getter failed: {0}")]
    Getter(String),

    #[error("state contains a reference cycle")]
    CyclicState,

    #[error("invalid date component: {0}")]
    InvalidDate(String),

    #[error("hydration error: {0}")]
    Hydration(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Failure of an action, a setup function, or a lifecycle callback.
///
/// Cloning is cheap: the same failure is handed to every after-action
/// listener before being returned to the caller.
#[derive(Clone)]
pub struct ActionError {
    message: Arc<str>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
}

impl ActionError {
    /// Create an error from a plain message.
    pub fn msg(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string().into(),
            source: None,
        }
    }

    /// Wrap an arbitrary error, keeping it reachable through `source()`.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            message: error.to_string().into(),
            source: Some(Arc::new(error)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Debug for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionError")
            .field("message", &self.message)
            .field("has_source", &self.source.is_some())
            .finish()
    }
}

impl fmt::Display for ActionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ActionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<StoreError> for ActionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Action(inner) => inner,
            other => ActionError::new(other),
        }
    }
}

impl From<&str> for ActionError {
    fn from(message: &str) -> Self {
        ActionError::msg(message)
    }
}

impl From<String> for ActionError {
    fn from(message: String) -> Self {
        ActionError::msg(message)
    }
}
