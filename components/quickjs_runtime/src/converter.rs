//! Mapping between host values and engine values.
//!
//! The converter is stateless. Engine values passed in are borrowed; engine
//! values returned are owned by the caller.

use host_api::{
    Array, BigInt, Function, JsString, Object, PointerValue, PropNameId, Symbol, Value,
};

use crate::pointer_value::{pointer_of, QuickJsPointerValue};
use crate::scoped::ScopedCString;
use crate::sys::{self, qjs, JSAtom, JSContext, JSValue};

/// Converts a borrowed engine value into a host value.
///
/// Engine kinds with no host counterpart become `undefined`.
///
/// # Safety
/// `ctx` must be live and `value` must belong to it.
pub(crate) unsafe fn to_host_value(ctx: *mut JSContext, value: JSValue) -> Value {
    match sys::tag(value) {
        sys::TAG_UNDEFINED => Value::Undefined,
        sys::TAG_NULL => Value::Null,
        sys::TAG_BOOL => Value::Bool(sys::get_bool(value)),
        sys::TAG_INT => Value::Number(sys::get_int(value) as f64),
        sys::TAG_FLOAT64 => Value::Number(sys::get_float64(value)),
        sys::TAG_STRING => Value::String(JsString::from_pointer(handle(ctx, value))),
        sys::TAG_SYMBOL => Value::Symbol(Symbol::from_pointer(handle(ctx, value))),
        sys::TAG_OBJECT => Value::Object(Object::from_pointer(handle(ctx, value))),
        sys::TAG_BIG_INT => Value::BigInt(BigInt::from_pointer(handle(ctx, value))),
        _ => Value::Undefined,
    }
}

/// Converts an engine value the caller owns, consuming the reference.
///
/// # Safety
/// `ctx` must be live and the caller must own `value`.
pub(crate) unsafe fn into_host_value(ctx: *mut JSContext, value: JSValue) -> Value {
    let host = to_host_value(ctx, value);
    sys::free(ctx, value);
    host
}

/// Converts a host value into an owned engine value.
///
/// # Safety
/// `ctx` must be live and every handle in `value` must come from it.
pub(crate) unsafe fn to_engine_value(ctx: *mut JSContext, value: &Value) -> JSValue {
    match value {
        Value::Undefined => sys::undefined(),
        Value::Null => sys::null(),
        Value::Bool(b) => sys::new_bool(*b),
        Value::Number(n) => sys::new_number(*n),
        Value::String(s) => new_string(ctx, string_bytes(ctx, s).as_bytes()),
        Value::Object(o) => pointer_of(o.pointer()).dereference(),
        Value::Symbol(s) => pointer_of(s.pointer()).dereference(),
        Value::BigInt(b) => pointer_of(b.pointer()).dereference(),
    }
}

/// Owned string value from UTF-8 bytes.
///
/// # Safety
/// `ctx` must be live.
pub(crate) unsafe fn new_string(ctx: *mut JSContext, utf8: &[u8]) -> JSValue {
    qjs::JS_NewStringLen(ctx, utf8.as_ptr() as *const _, utf8.len() as _)
}

unsafe fn string_bytes(ctx: *mut JSContext, s: &JsString) -> String {
    to_rust_string(ctx, pointer_of(s.pointer()).raw()).unwrap_or_default()
}

unsafe fn handle(ctx: *mut JSContext, value: JSValue) -> Box<dyn PointerValue> {
    Box::new(QuickJsPointerValue::new(ctx, value))
}

/// Wraps an owned engine value in a host handle.
///
/// # Safety
/// `ctx` must be live and the caller must transfer ownership of `value`.
pub(crate) unsafe fn owned_handle(ctx: *mut JSContext, value: JSValue) -> Box<dyn PointerValue> {
    Box::new(QuickJsPointerValue::from_owned(ctx, value))
}

fn expecting(ptr: &dyn PointerValue, expected: &[i32]) -> JSValue {
    let handle = pointer_of(ptr);
    debug_assert!(
        expected.contains(&sys::tag(handle.raw())),
        "handle tag {} is not one of {:?}",
        sys::tag(handle.raw()),
        expected
    );
    handle.dereference()
}

/// Owned engine string behind `s`.
pub(crate) fn to_engine_string(s: &JsString) -> JSValue {
    expecting(s.pointer(), &[sys::TAG_STRING])
}

/// Owned engine key (string or symbol) behind `name`.
pub(crate) fn to_engine_prop_name(name: &PropNameId) -> JSValue {
    expecting(name.pointer(), &[sys::TAG_STRING, sys::TAG_SYMBOL])
}

/// Owned engine symbol behind `sym`.
pub(crate) fn to_engine_symbol(sym: &Symbol) -> JSValue {
    expecting(sym.pointer(), &[sys::TAG_SYMBOL])
}

/// Owned engine object behind `obj`.
pub(crate) fn to_engine_object(obj: &Object) -> JSValue {
    expecting(obj.pointer(), &[sys::TAG_OBJECT])
}

/// Owned engine array behind `array`.
pub(crate) fn to_engine_array(array: &Array) -> JSValue {
    to_engine_object(array.as_object())
}

/// Owned engine function behind `func`.
pub(crate) fn to_engine_function(func: &Function) -> JSValue {
    to_engine_object(func.as_object())
}

/// Owned engine big integer behind `value`.
pub(crate) fn to_engine_bigint(value: &BigInt) -> JSValue {
    expecting(value.pointer(), &[sys::TAG_BIG_INT])
}

/// Borrowed engine value behind any handle.
pub(crate) fn raw_of(ptr: &dyn PointerValue) -> JSValue {
    pointer_of(ptr).raw()
}

/// Property key handle for a borrowed atom.
///
/// # Safety
/// `ctx` must be live and `atom` must belong to it.
pub(crate) unsafe fn to_prop_name_id(ctx: *mut JSContext, atom: JSAtom) -> PropNameId {
    PropNameId::from_pointer(owned_handle(ctx, qjs::JS_AtomToValue(ctx, atom)))
}

/// UTF-8 text of an engine value, as `String(value)` would render it.
///
/// Returns `None` when the conversion threw; the exception is left pending.
///
/// # Safety
/// `ctx` must be live and `value` must belong to it.
pub(crate) unsafe fn to_rust_string(ctx: *mut JSContext, value: JSValue) -> Option<String> {
    ScopedCString::from_value(ctx, value).map(|s| s.to_string_lossy())
}

/// Engine values for a host argument list.
pub(crate) struct EngineArgs {
    ctx: *mut JSContext,
    values: arrayvec::ArrayVec<JSValue, 8>,
    spilled: Vec<JSValue>,
}

impl EngineArgs {
    /// Converts `args`, inline for up to eight and on the heap beyond that.
    ///
    /// # Safety
    /// `ctx` must be live and every handle in `args` must come from it.
    pub(crate) unsafe fn new(ctx: *mut JSContext, args: &[Value]) -> Self {
        let mut out = Self {
            ctx,
            values: arrayvec::ArrayVec::new(),
            spilled: Vec::new(),
        };
        if args.len() <= out.values.capacity() {
            for arg in args {
                out.values.push(to_engine_value(ctx, arg));
            }
        } else {
            out.spilled = args.iter().map(|arg| to_engine_value(ctx, arg)).collect();
        }
        out
    }

    /// Argument count in the engine's integer type.
    pub(crate) fn len(&self) -> i32 {
        (self.values.len() + self.spilled.len()) as i32
    }

    /// Pointer to the contiguous argument array.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut JSValue {
        if self.spilled.is_empty() {
            self.values.as_mut_ptr()
        } else {
            self.spilled.as_mut_ptr()
        }
    }
}

impl Drop for EngineArgs {
    fn drop(&mut self) {
        for v in self.values.drain(..).chain(self.spilled.drain(..)) {
            unsafe { sys::free(self.ctx, v) }
        }
    }
}

/// Host values for an engine argument array.
///
/// # Safety
/// `argv` must point at `argc` live values of `ctx`.
pub(crate) unsafe fn host_args(ctx: *mut JSContext, argc: i32, argv: *const JSValue) -> HostArgs {
    let count = argc.max(0) as usize;
    let mut args = HostArgs::new();
    for i in 0..count {
        args.push(to_host_value(ctx, *argv.add(i)));
    }
    args
}

/// Host argument storage for calls into host closures.
pub(crate) enum HostArgs {
    Inline(arrayvec::ArrayVec<Value, 8>),
    Heap(Vec<Value>),
}

impl HostArgs {
    fn new() -> Self {
        HostArgs::Inline(arrayvec::ArrayVec::new())
    }

    fn push(&mut self, value: Value) {
        match self {
            HostArgs::Inline(inline) => {
                if let Err(overflow) = inline.try_push(value) {
                    let mut heap: Vec<Value> = inline.drain(..).collect();
                    heap.push(overflow.element());
                    *self = HostArgs::Heap(heap);
                }
            }
            HostArgs::Heap(heap) => heap.push(value),
        }
    }

    /// The arguments as a slice.
    pub(crate) fn as_slice(&self) -> &[Value] {
        match self {
            HostArgs::Inline(inline) => inline.as_slice(),
            HostArgs::Heap(heap) => heap.as_slice(),
        }
    }
}
