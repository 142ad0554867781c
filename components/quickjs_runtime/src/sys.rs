//! Thin shims over the engine's C API.
//!
//! Everything that depends on how the engine packs a `JSValue` (tag reads,
//! reference counting, immediate construction) goes through here, so the
//! rest of the crate never pokes at the value layout directly.

use std::os::raw::c_int;

pub(crate) use rquickjs::qjs;
pub(crate) use rquickjs::qjs::{JSAtom, JSClassID, JSContext, JSRuntime, JSValue};

pub(crate) const TAG_BIG_INT: i32 = qjs::JS_TAG_BIG_INT as i32;
pub(crate) const TAG_SYMBOL: i32 = qjs::JS_TAG_SYMBOL as i32;
pub(crate) const TAG_STRING: i32 = qjs::JS_TAG_STRING as i32;
pub(crate) const TAG_OBJECT: i32 = qjs::JS_TAG_OBJECT as i32;
pub(crate) const TAG_INT: i32 = qjs::JS_TAG_INT as i32;
pub(crate) const TAG_BOOL: i32 = qjs::JS_TAG_BOOL as i32;
pub(crate) const TAG_NULL: i32 = qjs::JS_TAG_NULL as i32;
pub(crate) const TAG_UNDEFINED: i32 = qjs::JS_TAG_UNDEFINED as i32;
pub(crate) const TAG_UNINITIALIZED: i32 = qjs::JS_TAG_UNINITIALIZED as i32;
pub(crate) const TAG_EXCEPTION: i32 = qjs::JS_TAG_EXCEPTION as i32;
pub(crate) const TAG_FLOAT64: i32 = qjs::JS_TAG_FLOAT64 as i32;

pub(crate) const EVAL_GLOBAL: c_int = qjs::JS_EVAL_TYPE_GLOBAL as c_int;
pub(crate) const EVAL_COMPILE_ONLY: c_int =
    (qjs::JS_EVAL_TYPE_GLOBAL | qjs::JS_EVAL_FLAG_COMPILE_ONLY) as c_int;
pub(crate) const WRITE_BYTECODE: c_int = qjs::JS_WRITE_OBJ_BYTECODE as c_int;
pub(crate) const READ_BYTECODE: c_int = qjs::JS_READ_OBJ_BYTECODE as c_int;

pub(crate) const PROP_CONFIGURABLE: c_int = qjs::JS_PROP_CONFIGURABLE as c_int;
pub(crate) const PROP_DATA: c_int =
    (qjs::JS_PROP_ENUMERABLE | qjs::JS_PROP_WRITABLE | qjs::JS_PROP_CONFIGURABLE) as c_int;

#[repr(C)]
struct RefCountHeader {
    ref_count: c_int,
}

/// Normalized tag of `v` (every float representation reads as float64).
#[inline]
pub(crate) fn tag(v: JSValue) -> i32 {
    unsafe { qjs::JS_VALUE_GET_NORM_TAG(v) as i32 }
}

/// Whether `v` is the exception sentinel.
#[inline]
pub(crate) fn is_exception(v: JSValue) -> bool {
    tag(v) == TAG_EXCEPTION
}

/// Whether `v` holds a heap pointer with a reference count.
#[inline]
pub(crate) fn has_ref_count(v: JSValue) -> bool {
    tag(v) < 0
}

/// Current engine reference count of `v`, if it is refcounted.
pub(crate) fn ref_count(v: JSValue) -> Option<i32> {
    if !has_ref_count(v) {
        return None;
    }
    // Every refcounted engine cell starts with its reference count.
    unsafe {
        let header = qjs::JS_VALUE_GET_PTR(v) as *const RefCountHeader;
        Some((*header).ref_count)
    }
}

#[inline]
pub(crate) fn get_int(v: JSValue) -> i32 {
    unsafe { qjs::JS_VALUE_GET_INT(v) }
}

#[inline]
pub(crate) fn get_float64(v: JSValue) -> f64 {
    unsafe { qjs::JS_VALUE_GET_FLOAT64(v) }
}

#[inline]
pub(crate) fn get_bool(v: JSValue) -> bool {
    get_int(v) != 0
}

/// A float64-tagged number, never the small-integer form.
#[inline]
pub(crate) fn new_number(n: f64) -> JSValue {
    unsafe { qjs::__JS_NewFloat64(n) }
}

#[inline]
pub(crate) fn new_bool(b: bool) -> JSValue {
    if b {
        qjs::JS_TRUE
    } else {
        qjs::JS_FALSE
    }
}

#[inline]
pub(crate) fn undefined() -> JSValue {
    qjs::JS_UNDEFINED
}

#[inline]
pub(crate) fn null() -> JSValue {
    qjs::JS_NULL
}

/// Acquires a new reference to `v`.
///
/// # Safety
/// `ctx` must be live and `v` must belong to its runtime.
#[inline]
pub(crate) unsafe fn dup(ctx: *mut JSContext, v: JSValue) -> JSValue {
    qjs::JS_DupValue(ctx, v)
}

/// Releases one reference to `v`.
///
/// # Safety
/// `ctx` must be live and the caller must own the reference.
#[inline]
pub(crate) unsafe fn free(ctx: *mut JSContext, v: JSValue) {
    qjs::JS_FreeValue(ctx, v)
}

/// Releases one reference to `v` through the runtime.
///
/// # Safety
/// `rt` must be live and the caller must own the reference.
#[inline]
pub(crate) unsafe fn free_rt(rt: *mut JSRuntime, v: JSValue) {
    qjs::JS_FreeValueRT(rt, v)
}

/// Truthiness of an engine return that is a C boolean in some engine
/// versions and an `int` in others.
#[inline]
pub(crate) fn flag(v: impl Into<i64>) -> bool {
    v.into() != 0
}
