//! Release guards for engine resources held on the stack.
//!
//! Each guard owns exactly one engine resource and gives it back when it goes
//! out of scope, on every exit path including early `?` returns.

use std::os::raw::c_char;

use crate::sys::{self, qjs, JSAtom, JSContext, JSValue};

/// Owns one engine value reference.
pub(crate) struct ScopedJsValue {
    ctx: *mut JSContext,
    value: JSValue,
}

impl ScopedJsValue {
    /// Adopts an owned reference.
    pub(crate) fn new(ctx: *mut JSContext, value: JSValue) -> Self {
        Self { ctx, value }
    }

    /// Borrows the value.
    pub(crate) fn get(&self) -> JSValue {
        self.value
    }

    /// Hands the reference back to the caller, who must release it.
    pub(crate) fn release(self) -> JSValue {
        let value = self.value;
        std::mem::forget(self);
        value
    }

    /// Takes an extra reference for the caller.
    pub(crate) fn dup(&self) -> JSValue {
        unsafe { sys::dup(self.ctx, self.value) }
    }
}

impl Drop for ScopedJsValue {
    fn drop(&mut self) {
        unsafe { sys::free(self.ctx, self.value) }
    }
}

/// Owns a C string handed out by the engine.
pub(crate) struct ScopedCString {
    ctx: *mut JSContext,
    ptr: *const c_char,
    len: usize,
}

impl ScopedCString {
    /// Converts `value` to a string. `None` means the conversion threw.
    pub(crate) fn from_value(ctx: *mut JSContext, value: JSValue) -> Option<Self> {
        let mut len = 0usize;
        let ptr = unsafe { qjs::JS_ToCStringLen(ctx, &mut len, value) };
        if ptr.is_null() {
            None
        } else {
            Some(Self { ctx, ptr, len })
        }
    }

    /// The raw bytes, without the terminating NUL.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr as *const u8, self.len) }
    }

    /// Copies the text out. Lone surrogates come back as U+FFFD.
    pub(crate) fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

impl Drop for ScopedCString {
    fn drop(&mut self) {
        unsafe { qjs::JS_FreeCString(self.ctx, self.ptr) }
    }
}

/// Owns one atom reference.
pub(crate) struct ScopedAtom {
    ctx: *mut JSContext,
    atom: JSAtom,
}

impl ScopedAtom {
    /// Interns the property key `value`. `None` means the conversion threw.
    pub(crate) fn from_value(ctx: *mut JSContext, value: JSValue) -> Option<Self> {
        let atom = unsafe { qjs::JS_ValueToAtom(ctx, value) };
        if atom == 0 {
            None
        } else {
            Some(Self { ctx, atom })
        }
    }

    /// Borrows the atom.
    pub(crate) fn get(&self) -> JSAtom {
        self.atom
    }
}

impl Drop for ScopedAtom {
    fn drop(&mut self) {
        unsafe { qjs::JS_FreeAtom(self.ctx, self.atom) }
    }
}
