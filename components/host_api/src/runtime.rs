//! The embedding contract an engine adapter implements.

use std::rc::Rc;
use std::sync::Arc;

use crate::buffer::{Buffer, MutableBuffer, PreparedJavaScript};
use crate::error::Result;
use crate::host::{HostFunction, HostObject, NativeState};
use crate::instrumentation::Instrumentation;
use crate::value::{
    Array, ArrayBuffer, BigInt, Function, JsString, Object, PropNameId, Symbol, Value, WeakObject,
};

/// A script engine instance driven through engine-agnostic handles.
///
/// Every handle passed in must have been produced by the same runtime.
/// Implementations are single-threaded; handles must be released before the
/// runtime itself is dropped.
///
/// Most hosts use the convenience methods on [`Value`], [`Object`],
/// [`Function`] and friends, which forward here.
pub trait Runtime {
    // Evaluation

    /// Compiles and runs `buffer`, then drains pending jobs.
    ///
    /// `source_url` names the unit in stack traces and keys the bytecode
    /// cache when the implementation has one.
    fn evaluate_javascript(&self, buffer: Arc<dyn Buffer>, source_url: &str) -> Result<Value>;

    /// Wraps a source unit for later evaluation.
    fn prepare_javascript(
        &self,
        buffer: Arc<dyn Buffer>,
        source_url: String,
    ) -> Result<Arc<dyn PreparedJavaScript>>;

    /// Evaluates a unit returned by [`Runtime::prepare_javascript`].
    fn evaluate_prepared_javascript(&self, prepared: &Arc<dyn PreparedJavaScript>)
        -> Result<Value>;

    /// Runs at most `max_hint` pending jobs (`-1` means no bound).
    ///
    /// Returns `true` once the queue reports empty and `false` when the bound
    /// was reached first.
    fn drain_microtasks(&self, max_hint: i32) -> Result<bool>;

    // Runtime information

    /// The global object.
    fn global(&self) -> Object;

    /// Human-readable engine description.
    fn description(&self) -> String;

    /// Whether a debugger can attach.
    fn is_inspectable(&self) -> bool;

    /// Heap and GC introspection.
    fn instrumentation(&self) -> &dyn Instrumentation;

    // Property names

    /// Property key from ASCII bytes.
    fn create_prop_name_id_from_ascii(&self, ascii: &[u8]) -> PropNameId;

    /// Property key from UTF-8 bytes.
    fn create_prop_name_id_from_utf8(&self, utf8: &[u8]) -> PropNameId;

    /// Property key from a string handle.
    fn create_prop_name_id_from_string(&self, name: &JsString) -> Result<PropNameId>;

    /// Property key from a symbol handle.
    fn create_prop_name_id_from_symbol(&self, sym: &Symbol) -> Result<PropNameId>;

    /// UTF-8 text of a property key.
    fn prop_name_id_utf8(&self, name: &PropNameId) -> Result<String>;

    /// Whether two keys name the same property.
    fn prop_name_id_equals(&self, a: &PropNameId, b: &PropNameId) -> Result<bool>;

    // Strings and symbols

    /// String from ASCII bytes.
    fn create_string_from_ascii(&self, ascii: &[u8]) -> JsString;

    /// String from UTF-8 bytes. Invalid sequences are replaced.
    fn create_string_from_utf8(&self, utf8: &[u8]) -> JsString;

    /// UTF-8 text of a string.
    fn string_utf8(&self, s: &JsString) -> Result<String>;

    /// `Symbol(description)` rendering of a symbol.
    fn symbol_to_string(&self, sym: &Symbol) -> Result<String>;

    // Big integers

    /// Big integer from `i64`.
    fn create_bigint_from_i64(&self, value: i64) -> BigInt;

    /// Big integer from `u64`.
    fn create_bigint_from_u64(&self, value: u64) -> BigInt;

    /// Whether the value fits in `i64`.
    fn bigint_is_int64(&self, value: &BigInt) -> Result<bool>;

    /// Whether the value fits in `u64`.
    fn bigint_is_uint64(&self, value: &BigInt) -> Result<bool>;

    /// The value modulo 2^64.
    fn truncate(&self, value: &BigInt) -> Result<u64>;

    /// Rendering in `radix` (2..=36).
    fn bigint_to_string(&self, value: &BigInt, radix: u32) -> Result<JsString>;

    // Objects

    /// A fresh plain object.
    fn create_object(&self) -> Object;

    /// An object whose property access is served by `host`.
    fn create_object_with_host_object(&self, host: Rc<dyn HostObject>) -> Result<Object>;

    /// The host object behind `obj`, if any.
    fn get_host_object(&self, obj: &Object) -> Option<Rc<dyn HostObject>>;

    /// The host closure behind `func`, if any.
    fn get_host_function(&self, func: &Function) -> Option<HostFunction>;

    /// Whether `obj` has native state attached.
    fn has_native_state(&self, obj: &Object) -> bool;

    /// The native state attached to `obj`.
    fn get_native_state(&self, obj: &Object) -> Option<NativeState>;

    /// Attaches native state to `obj`, replacing any previous state.
    fn set_native_state(&self, obj: &Object, state: NativeState) -> Result<()>;

    /// `obj[name]`.
    fn get_property(&self, obj: &Object, name: &PropNameId) -> Result<Value>;

    /// `obj[name]` with a string key.
    fn get_property_by_string(&self, obj: &Object, name: &JsString) -> Result<Value>;

    /// `name in obj`.
    fn has_property(&self, obj: &Object, name: &PropNameId) -> Result<bool>;

    /// `name in obj` with a string key.
    fn has_property_by_string(&self, obj: &Object, name: &JsString) -> Result<bool>;

    /// `obj[name] = value`.
    fn set_property_value(&self, obj: &Object, name: &PropNameId, value: &Value) -> Result<()>;

    /// `obj[name] = value` with a string key.
    fn set_property_value_by_string(
        &self,
        obj: &Object,
        name: &JsString,
        value: &Value,
    ) -> Result<()>;

    /// Whether `obj` is an array.
    fn is_array(&self, obj: &Object) -> bool;

    /// Whether `obj` is an `ArrayBuffer`.
    fn is_array_buffer(&self, obj: &Object) -> bool;

    /// Whether `obj` is callable.
    fn is_function(&self, obj: &Object) -> bool;

    /// Whether `obj` is backed by a host object.
    fn is_host_object(&self, obj: &Object) -> bool;

    /// Whether `func` is backed by a host closure.
    fn is_host_function(&self, func: &Function) -> bool;

    /// Enumerable own string keys of `obj`.
    fn get_property_names(&self, obj: &Object) -> Result<Array>;

    // Weak references

    /// Weak reference to `obj`.
    fn create_weak_object(&self, obj: &Object) -> Result<WeakObject>;

    /// The referent of `weak`, or `undefined` once collected.
    fn lock_weak_object(&self, weak: &WeakObject) -> Result<Value>;

    // Arrays and buffers

    /// Array with `length` empty slots.
    fn create_array(&self, length: usize) -> Result<Array>;

    /// `ArrayBuffer` over host memory.
    fn create_array_buffer(&self, buffer: Arc<MutableBuffer>) -> Result<ArrayBuffer>;

    /// `array.length`.
    fn array_size(&self, array: &Array) -> Result<usize>;

    /// `buffer.byteLength`.
    fn array_buffer_size(&self, buffer: &ArrayBuffer) -> Result<usize>;

    /// Copy of the buffer contents.
    fn array_buffer_data(&self, buffer: &ArrayBuffer) -> Result<Vec<u8>>;

    /// `array[index]`.
    fn get_value_at_index(&self, array: &Array, index: usize) -> Result<Value>;

    /// `array[index] = value`.
    fn set_value_at_index(&self, array: &Array, index: usize, value: &Value) -> Result<()>;

    // Functions

    /// Exposes `func` as a script function with the given `name` and `length`.
    fn create_function_from_host_function(
        &self,
        name: &PropNameId,
        param_count: u32,
        func: HostFunction,
    ) -> Result<Function>;

    /// `func.call(this, ...args)`.
    fn call(&self, func: &Function, this: &Value, args: &[Value]) -> Result<Value>;

    /// `new func(...args)`.
    fn call_as_constructor(&self, func: &Function, args: &[Value]) -> Result<Value>;

    // Equality

    /// `a === b` for symbols.
    fn strict_equals_symbol(&self, a: &Symbol, b: &Symbol) -> bool;

    /// `a === b` for big integers.
    fn strict_equals_bigint(&self, a: &BigInt, b: &BigInt) -> bool;

    /// `a === b` for strings.
    fn strict_equals_string(&self, a: &JsString, b: &JsString) -> bool;

    /// `a === b` for objects.
    fn strict_equals_object(&self, a: &Object, b: &Object) -> bool;

    /// `obj instanceof ctor`.
    fn instance_of(&self, obj: &Object, ctor: &Function) -> Result<bool>;
}
