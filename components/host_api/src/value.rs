//! Host-side value representation.
//!
//! [`Value`] is the closed tagged union every contract operation works on.
//! Primitive kinds are stored inline; managed kinds (strings, objects, symbols,
//! big integers) hold an engine-owned handle behind the [`PointerValue`]
//! contract, so this crate never sees an engine's native types.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use num_bigint::BigInt as NumBigInt;

use crate::error::Result;
use crate::host::{HostFunction, HostObject};
use crate::runtime::Runtime;

/// Contract for an engine-owned reference.
///
/// An implementation holds exactly one strong engine-level reference for its
/// whole lifetime. Cloning acquires a new reference to the same engine value;
/// dropping the box releases it (this is the "invalidate" step, and it runs
/// exactly once per handle).
pub trait PointerValue: Any {
    /// Produces an independent handle to the same engine value.
    fn clone_pointer(&self) -> Box<dyn PointerValue>;

    /// Upcast used by engine adapters to recover their concrete handle type.
    fn as_any(&self) -> &dyn Any;
}

macro_rules! pointer_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name {
            ptr: Box<dyn PointerValue>,
        }

        impl $name {
            /// Wraps an engine handle. Engine adapters are the only callers.
            pub fn from_pointer(ptr: Box<dyn PointerValue>) -> Self {
                Self { ptr }
            }

            /// Borrows the underlying engine handle.
            pub fn pointer(&self) -> &dyn PointerValue {
                self.ptr.as_ref()
            }

            /// Releases the handle now instead of at end of scope.
            pub fn invalidate(self) {
                drop(self);
            }
        }

        impl Clone for $name {
            fn clone(&self) -> Self {
                Self {
                    ptr: self.ptr.clone_pointer(),
                }
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(..)"))
            }
        }
    };
}

pointer_handle!(
    /// Handle to an engine string.
    JsString
);
pointer_handle!(
    /// Handle to an engine symbol.
    Symbol
);
pointer_handle!(
    /// Handle to an engine big integer.
    BigInt
);
pointer_handle!(
    /// Handle to a property key (a string or a symbol).
    PropNameId
);
pointer_handle!(
    /// Handle to an engine object.
    Object
);
pointer_handle!(
    /// Handle to a weak reference. No shipped adapter supports these yet.
    WeakObject
);

macro_rules! object_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name(Object);

        impl $name {
            /// Reinterprets an object handle without checking its kind.
            ///
            /// Prefer the checked conversions on [`Object`].
            pub fn from_object_unchecked(object: Object) -> Self {
                Self(object)
            }

            /// Borrows this view as a plain object.
            pub fn as_object(&self) -> &Object {
                &self.0
            }

            /// Converts this view back into a plain object.
            pub fn into_object(self) -> Object {
                self.0
            }
        }

        impl From<$name> for Object {
            fn from(view: $name) -> Object {
                view.0
            }
        }

        impl From<$name> for Value {
            fn from(view: $name) -> Value {
                Value::Object(view.0)
            }
        }
    };
}

object_view!(
    /// An object known to be an array.
    Array
);
object_view!(
    /// An object known to be callable.
    Function
);
object_view!(
    /// An object known to be an `ArrayBuffer`.
    ArrayBuffer
);

/// The kind tag of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// `true` / `false`
    Bool,
    /// IEEE 754 double
    Number,
    /// String
    String,
    /// Object (including arrays and functions)
    Object,
    /// Symbol
    Symbol,
    /// Big integer
    BigInt,
}

/// Represents any script-visible value.
///
/// The set of variants is closed: adapters convert every engine value into
/// one of these, falling back to `Undefined` for engine kinds the contract
/// does not model.
///
/// # Examples
///
/// ```
/// use host_api::Value;
///
/// let v = Value::from(true);
/// assert_eq!(v.as_bool(), Some(true));
/// assert!(Value::null().is_null());
/// assert_eq!(Value::from(1.5).as_number(), Some(1.5));
/// ```
#[derive(Clone, Default)]
pub enum Value {
    /// JavaScript `undefined`
    #[default]
    Undefined,
    /// JavaScript `null`
    Null,
    /// JavaScript boolean
    Bool(bool),
    /// JavaScript number (always a double at this boundary)
    Number(f64),
    /// Engine string handle
    String(JsString),
    /// Engine object handle
    Object(Object),
    /// Engine symbol handle
    Symbol(Symbol),
    /// Engine big integer handle
    BigInt(BigInt),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(_) => write!(f, "String(..)"),
            Value::Object(_) => write!(f, "Object(..)"),
            Value::Symbol(_) => write!(f, "Symbol(..)"),
            Value::BigInt(_) => write!(f, "BigInt(..)"),
        }
    }
}

impl Value {
    /// `undefined`.
    pub fn undefined() -> Self {
        Value::Undefined
    }

    /// `null`.
    pub fn null() -> Self {
        Value::Null
    }

    /// Returns the kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
            Value::Symbol(_) => ValueKind::Symbol,
            Value::BigInt(_) => ValueKind::BigInt,
        }
    }

    /// Whether this is `undefined`.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Whether this is `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Whether this is a boolean.
    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Whether this is a number.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Whether this is a string.
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Whether this is an object.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    /// Whether this is a symbol.
    pub fn is_symbol(&self) -> bool {
        matches!(self, Value::Symbol(_))
    }

    /// Whether this is a big integer.
    pub fn is_bigint(&self) -> bool {
        matches!(self, Value::BigInt(_))
    }

    /// The boolean payload, if any.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The number payload, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The string handle, if any.
    pub fn as_string(&self) -> Option<&JsString> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The object handle, if any.
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The symbol handle, if any.
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self {
            Value::Symbol(s) => Some(s),
            _ => None,
        }
    }

    /// The big integer handle, if any.
    pub fn as_bigint(&self) -> Option<&BigInt> {
        match self {
            Value::BigInt(b) => Some(b),
            _ => None,
        }
    }

    /// Consumes the value and returns its object handle, if any.
    pub fn into_object(self) -> Option<Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Reads a string value as UTF-8.
    pub fn as_utf8(&self, rt: &dyn Runtime) -> Result<Option<String>> {
        match self {
            Value::String(s) => s.utf8(rt).map(Some),
            _ => Ok(None),
        }
    }

    /// Strict equality (`===`) between two values.
    ///
    /// Primitives are compared locally; managed kinds ask the runtime, since
    /// two distinct handles may refer to the same engine value.
    pub fn strict_equals(rt: &dyn Runtime, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Number(x), Value::Number(y)) => x == y,
            (Value::String(x), Value::String(y)) => rt.strict_equals_string(x, y),
            (Value::Object(x), Value::Object(y)) => rt.strict_equals_object(x, y),
            (Value::Symbol(x), Value::Symbol(y)) => rt.strict_equals_symbol(x, y),
            (Value::BigInt(x), Value::BigInt(y)) => rt.strict_equals_bigint(x, y),
            _ => false,
        }
    }

    /// Converts this value with the script's `String()` function.
    pub fn to_js_string(&self, rt: &dyn Runtime) -> Result<JsString> {
        if let Value::String(s) = self {
            return Ok(s.clone());
        }
        let string_ctor = rt.global().get_property(rt, "String")?;
        let string_fn = match string_ctor.into_object() {
            Some(obj) => obj.into_function(rt)?,
            None => None,
        };
        let Some(string_fn) = string_fn else {
            return Err(crate::JsiError::host("global String is not a function"));
        };
        match string_fn.call(rt, std::slice::from_ref(self))? {
            Value::String(s) => Ok(s),
            _ => Err(crate::JsiError::host("String() did not return a string")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<JsString> for Value {
    fn from(s: JsString) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<BigInt> for Value {
    fn from(b: BigInt) -> Self {
        Value::BigInt(b)
    }
}

impl JsString {
    /// Creates a string from UTF-8 text.
    pub fn from_utf8(rt: &dyn Runtime, text: &str) -> JsString {
        rt.create_string_from_utf8(text.as_bytes())
    }

    /// Reads the string as UTF-8.
    pub fn utf8(&self, rt: &dyn Runtime) -> Result<String> {
        rt.string_utf8(self)
    }
}

impl PropNameId {
    /// Creates a property key from UTF-8 text.
    pub fn for_utf8(rt: &dyn Runtime, name: &str) -> PropNameId {
        rt.create_prop_name_id_from_utf8(name.as_bytes())
    }

    /// Creates a property key from a string handle.
    pub fn from_string(rt: &dyn Runtime, name: &JsString) -> Result<PropNameId> {
        rt.create_prop_name_id_from_string(name)
    }

    /// Reads the key as UTF-8.
    pub fn utf8(&self, rt: &dyn Runtime) -> Result<String> {
        rt.prop_name_id_utf8(self)
    }

    /// Whether two keys name the same property.
    pub fn compare(rt: &dyn Runtime, a: &PropNameId, b: &PropNameId) -> Result<bool> {
        rt.prop_name_id_equals(a, b)
    }
}

impl Symbol {
    /// `Symbol(description)` rendering of this symbol.
    pub fn to_js_string(&self, rt: &dyn Runtime) -> Result<String> {
        rt.symbol_to_string(self)
    }
}

impl BigInt {
    /// Creates a big integer from a signed 64-bit value.
    pub fn from_i64(rt: &dyn Runtime, value: i64) -> BigInt {
        rt.create_bigint_from_i64(value)
    }

    /// Creates a big integer from an unsigned 64-bit value.
    pub fn from_u64(rt: &dyn Runtime, value: u64) -> BigInt {
        rt.create_bigint_from_u64(value)
    }

    /// Whether the value fits in an `i64` without loss.
    pub fn is_int64(&self, rt: &dyn Runtime) -> Result<bool> {
        rt.bigint_is_int64(self)
    }

    /// Whether the value fits in a `u64` without loss.
    pub fn is_uint64(&self, rt: &dyn Runtime) -> Result<bool> {
        rt.bigint_is_uint64(self)
    }

    /// The low 64 bits of the value (two's complement for negatives).
    pub fn truncate(&self, rt: &dyn Runtime) -> Result<u64> {
        rt.truncate(self)
    }

    /// Renders the value in the given radix (2..=36).
    pub fn to_js_string(&self, rt: &dyn Runtime, radix: u32) -> Result<JsString> {
        rt.bigint_to_string(self, radix)
    }

    /// Copies the value into an arbitrary-precision host integer.
    pub fn to_num_bigint(&self, rt: &dyn Runtime) -> Result<NumBigInt> {
        let text = self.to_js_string(rt, 10)?.utf8(rt)?;
        text.parse::<NumBigInt>()
            .map_err(|e| crate::JsiError::host(format!("malformed big integer {text:?}: {e}")))
    }
}

impl Object {
    /// Creates an empty plain object.
    pub fn new(rt: &dyn Runtime) -> Object {
        rt.create_object()
    }

    /// Creates an object whose property access is served by `host`.
    pub fn from_host_object(rt: &dyn Runtime, host: Rc<dyn HostObject>) -> Result<Object> {
        rt.create_object_with_host_object(host)
    }

    /// Reads a property by UTF-8 name.
    pub fn get_property(&self, rt: &dyn Runtime, name: &str) -> Result<Value> {
        rt.get_property(self, &PropNameId::for_utf8(rt, name))
    }

    /// Writes a property by UTF-8 name.
    pub fn set_property(&self, rt: &dyn Runtime, name: &str, value: impl Into<Value>) -> Result<()> {
        rt.set_property_value(self, &PropNameId::for_utf8(rt, name), &value.into())
    }

    /// Whether the object (or its prototype chain) has the property.
    pub fn has_property(&self, rt: &dyn Runtime, name: &str) -> Result<bool> {
        rt.has_property(self, &PropNameId::for_utf8(rt, name))
    }

    /// Enumerable own string keys, as an array of strings.
    pub fn get_property_names(&self, rt: &dyn Runtime) -> Result<Array> {
        rt.get_property_names(self)
    }

    /// Whether this object is an array.
    pub fn is_array(&self, rt: &dyn Runtime) -> bool {
        rt.is_array(self)
    }

    /// Whether this object is callable.
    pub fn is_function(&self, rt: &dyn Runtime) -> bool {
        rt.is_function(self)
    }

    /// Whether this object is backed by a [`HostObject`].
    pub fn is_host_object(&self, rt: &dyn Runtime) -> bool {
        rt.is_host_object(self)
    }

    /// Whether this object is an instance of `ctor`.
    pub fn instance_of(&self, rt: &dyn Runtime, ctor: &Function) -> Result<bool> {
        rt.instance_of(self, ctor)
    }

    /// The host object behind this object, if it is a host object.
    pub fn get_host_object(&self, rt: &dyn Runtime) -> Option<Rc<dyn HostObject>> {
        rt.get_host_object(self)
    }

    /// Checked conversion to an array view.
    pub fn as_array(&self, rt: &dyn Runtime) -> Option<Array> {
        rt.is_array(self)
            .then(|| Array::from_object_unchecked(self.clone()))
    }

    /// Checked conversion to a function view.
    pub fn as_function(&self, rt: &dyn Runtime) -> Option<Function> {
        rt.is_function(self)
            .then(|| Function::from_object_unchecked(self.clone()))
    }

    /// Consuming conversion to a function view.
    pub fn into_function(self, rt: &dyn Runtime) -> Result<Option<Function>> {
        if rt.is_function(&self) {
            Ok(Some(Function::from_object_unchecked(self)))
        } else {
            Ok(None)
        }
    }
}

impl Array {
    /// Creates an array with `length` empty slots.
    pub fn new(rt: &dyn Runtime, length: usize) -> Result<Array> {
        rt.create_array(length)
    }

    /// Current `length` of the array.
    pub fn size(&self, rt: &dyn Runtime) -> Result<usize> {
        rt.array_size(self)
    }

    /// Reads element `index`.
    pub fn get_value_at_index(&self, rt: &dyn Runtime, index: usize) -> Result<Value> {
        rt.get_value_at_index(self, index)
    }

    /// Writes element `index`.
    pub fn set_value_at_index(
        &self,
        rt: &dyn Runtime,
        index: usize,
        value: impl Into<Value>,
    ) -> Result<()> {
        rt.set_value_at_index(self, index, &value.into())
    }
}

impl Function {
    /// Exposes a host closure to scripts as a function named `name`.
    pub fn from_host_function(
        rt: &dyn Runtime,
        name: &str,
        param_count: u32,
        func: HostFunction,
    ) -> Result<Function> {
        rt.create_function_from_host_function(&PropNameId::for_utf8(rt, name), param_count, func)
    }

    /// Calls the function with `this` bound to `undefined`.
    pub fn call(&self, rt: &dyn Runtime, args: &[Value]) -> Result<Value> {
        rt.call(self, &Value::Undefined, args)
    }

    /// Calls the function with an explicit `this`.
    pub fn call_with_this(&self, rt: &dyn Runtime, this: &Object, args: &[Value]) -> Result<Value> {
        rt.call(self, &Value::Object(this.clone()), args)
    }

    /// Calls the function as a constructor (`new f(...)`).
    pub fn call_as_constructor(&self, rt: &dyn Runtime, args: &[Value]) -> Result<Value> {
        rt.call_as_constructor(self, args)
    }

    /// Whether the function is backed by a [`HostFunction`].
    pub fn is_host_function(&self, rt: &dyn Runtime) -> bool {
        rt.is_host_function(self)
    }

    /// The host closure behind this function, if any.
    pub fn get_host_function(&self, rt: &dyn Runtime) -> Option<HostFunction> {
        rt.get_host_function(self)
    }
}
