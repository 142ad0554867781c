//! Error taxonomy of the embedding contract.
//!
//! Only [`JsiError::Js`] carries a script-visible value. It is the single
//! error kind that crosses the engine boundary in either direction: an engine
//! exception surfaces to the host as `JsiError::Js`, and a host callback
//! returning `JsiError::Js` is thrown into the engine with its payload.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::runtime::Runtime;
use crate::value::Value;

/// A script error carrying the thrown value.
///
/// # Examples
///
/// ```
/// use host_api::{JsError, Value};
///
/// let err = JsError::new(Value::from(7), "7");
/// assert_eq!(err.message(), "7");
/// assert!(err.stack().is_none());
/// ```
#[derive(Clone)]
pub struct JsError {
    value: Value,
    message: String,
    stack: Option<String>,
}

impl JsError {
    /// Wraps an already-rendered thrown value.
    pub fn new(value: Value, message: impl Into<String>) -> Self {
        Self {
            value,
            message: message.into(),
            stack: None,
        }
    }

    /// Attaches a stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Builds an error from a thrown value, rendering it with `String()`.
    ///
    /// The `stack` property is picked up when the value is an object that
    /// carries one (engine `Error` instances do).
    pub fn from_value(rt: &dyn Runtime, value: Value) -> Self {
        let message = value
            .to_js_string(rt)
            .and_then(|s| s.utf8(rt))
            .unwrap_or_else(|_| "<unprintable exception>".to_string());
        let stack = value
            .as_object()
            .and_then(|obj| obj.get_property(rt, "stack").ok())
            .and_then(|s| s.as_utf8(rt).ok().flatten());
        Self {
            value,
            message,
            stack,
        }
    }

    /// Creates a script `Error` object with the given message.
    pub fn from_message(rt: &dyn Runtime, message: &str) -> Self {
        let text = Value::String(rt.create_string_from_utf8(message.as_bytes()));
        let error_value = rt
            .global()
            .get_property(rt, "Error")
            .ok()
            .and_then(Value::into_object)
            .and_then(|ctor| ctor.as_function(rt))
            .and_then(|ctor| ctor.call_as_constructor(rt, std::slice::from_ref(&text)).ok())
            .unwrap_or(text);
        Self::from_value(rt, error_value)
    }

    /// The thrown value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// The rendered message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The stack trace, when the engine provided one.
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Consumes the error and returns the thrown value.
    pub fn into_value(self) -> Value {
        self.value
    }
}

impl fmt::Debug for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsError")
            .field("message", &self.message)
            .field("stack", &self.stack)
            .finish()
    }
}

impl fmt::Display for JsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(stack) = &self.stack {
            write!(f, "\n{}", stack)?;
        }
        Ok(())
    }
}

impl std::error::Error for JsError {}

/// Every failure an embedding operation can report.
#[derive(Debug, Error)]
pub enum JsiError {
    /// An exception thrown by script code or carrying a script-visible value.
    #[error("{0}")]
    Js(#[from] JsError),

    /// A host-side failure with no script-visible payload.
    #[error("host error: {0}")]
    Host(String),

    /// The operation is not supported by this runtime.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    /// The bytecode cache file could not be written.
    #[error("code cache write failed for {}: {source}", path.display())]
    CodeCache {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The engine produced no bytecode for a compiled unit.
    #[error("bytecode serialization failed: {0}")]
    BytecodeSerialization(String),

    /// Invalid runtime configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The engine could not allocate a runtime or context.
    #[error("engine error: {0}")]
    Engine(String),
}

impl JsiError {
    /// Shorthand for [`JsiError::Host`].
    pub fn host(message: impl Into<String>) -> Self {
        JsiError::Host(message.into())
    }

    /// Whether this error carries a script-visible value.
    pub fn is_script_error(&self) -> bool {
        matches!(self, JsiError::Js(_))
    }

    /// The script error, if this is one.
    pub fn as_js_error(&self) -> Option<&JsError> {
        match self {
            JsiError::Js(e) => Some(e),
            _ => None,
        }
    }
}

/// Result alias used throughout the embedding contract.
pub type Result<T> = std::result::Result<T, JsiError>;
