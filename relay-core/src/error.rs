//! Error types shared across the crate.

use std::any::Any;

/// Errors raised by delegate construction, the static algebra, and the
/// async dispatch helpers.
///
/// Synchronous `invoke` never returns this type: a panicking callback
/// unwinds straight through the caller, like any other Rust call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DelegateError {
    /// A required operand was absent.
    #[error("argument `{param}` must not be absent")]
    NullArgument {
        /// Name of the offending parameter.
        param: &'static str,
    },

    /// The async invocation was cancelled before any callback ran.
    #[error("invocation cancelled before dispatch")]
    Cancelled,

    /// A callback panicked while running on a worker.
    #[error("callback panicked: {message}")]
    CallbackPanicked {
        /// Panic payload rendered as text, when it was a string.
        message: String,
    },

    /// `end_invoke` was called twice on the same handle.
    #[error("async result was already consumed")]
    ResultConsumed,

    /// The worker dropped the task without reporting a result.
    #[error("worker dropped the invocation before completing it")]
    WorkerUnavailable,

    /// Dispatch configuration could not be parsed or applied.
    #[error("dispatch configuration error: {0}")]
    Config(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DelegateError>;

impl DelegateError {
    /// Build a [`DelegateError::CallbackPanicked`] from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::CallbackPanicked { message }
    }
}

/// Precondition check for operands that must be present.
///
/// Returns the inner value or a [`DelegateError::NullArgument`] naming the
/// parameter.
pub(crate) fn require<T>(value: Option<T>, param: &'static str) -> Result<T> {
    value.ok_or(DelegateError::NullArgument { param })
}
