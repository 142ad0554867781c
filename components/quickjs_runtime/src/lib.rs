//! QuickJS adapter for the `host_api` embedding contract.
//!
//! The host drives scripts through [`host_api::Runtime`]; this crate
//! implements it on top of the QuickJS C API. It marshals values in both
//! directions, lets host objects and host functions appear as native engine
//! objects, and keeps compiled bytecode on disk between runs.
//!
//! # Overview
//!
//! - [`QuickJsRuntime`] - The runtime facade (owns one engine runtime + context)
//! - [`RuntimeConfig`] - Engine limits and cache location, loadable from JSON
//! - [`CodeCache`] - Disk-backed bytecode cache with shared hit/miss counters
//! - [`QuickJsPointerValue`] - The engine reference behind every managed handle
//! - [`QuickJsInstrumentation`] - Heap counters and explicit collection
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use host_api::{Runtime, StringBuffer, Value};
//! use quickjs_runtime::{QuickJsRuntime, RuntimeConfig};
//!
//! let rt = QuickJsRuntime::new(RuntimeConfig::default().without_code_cache()).unwrap();
//! let global = rt.global();
//! global.set_property(rt.as_runtime(), "base", 40).unwrap();
//!
//! let v = rt
//!     .evaluate_javascript(Arc::new(StringBuffer::new("base + 2")), "sum.js")
//!     .unwrap();
//! assert_eq!(v.as_number(), Some(42.0));
//! drop(global);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod code_cache;
mod config;
mod converter;
mod host_proxy;
mod instrumentation;
mod pointer_value;
mod runtime;
mod scoped;
mod sys;

pub use code_cache::{CodeCache, CodeCacheItem, CodeCacheState, CodeCacheStats};
pub use config::RuntimeConfig;
pub use instrumentation::QuickJsInstrumentation;
pub use pointer_value::{handle_ref_count, QuickJsPointerValue};
pub use runtime::{create_quickjs_runtime, QuickJsRuntime};
