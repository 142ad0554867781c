//! Engine-agnostic embedding contract.
//!
//! This crate defines everything a host application needs to drive a
//! JavaScript engine without naming any of the engine's native types:
//! a closed value model, opaque engine-owned handles, host objects and host
//! functions that scripts can call back into, and the [`Runtime`] trait an
//! engine adapter implements.
//!
//! # Overview
//!
//! - [`Value`] - Tagged union over every script-visible value kind
//! - [`PointerValue`] - Contract for engine-owned handles (clone / invalidate)
//! - [`Object`], [`Function`], [`Array`], [`JsString`], [`Symbol`],
//!   [`BigInt`], [`PropNameId`] - Typed handle wrappers
//! - [`HostObject`], [`HostFunction`] - Host code exposed to scripts
//! - [`Runtime`] - The embedding contract implemented by an engine adapter
//! - [`JsiError`] - Error taxonomy; [`JsError`] is the script-visible kind
//!
//! # Examples
//!
//! ```
//! use host_api::{Value, ValueKind};
//!
//! let n = Value::from(42);
//! assert_eq!(n.kind(), ValueKind::Number);
//! assert_eq!(n.as_number(), Some(42.0));
//! assert!(Value::undefined().is_undefined());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod buffer;
mod error;
mod host;
mod instrumentation;
mod runtime;
mod value;

pub use buffer::{
    Buffer, MutableBuffer, PreparedJavaScript, SourceJavaScriptPreparation, StringBuffer,
};
pub use error::{JsError, JsiError, Result};
pub use host::{HostFunction, HostObject, NativeState};
pub use instrumentation::Instrumentation;
pub use runtime::Runtime;
pub use value::{
    Array, ArrayBuffer, BigInt, Function, JsString, Object, PointerValue, PropNameId, Symbol,
    Value, ValueKind, WeakObject,
};
