//! Engine-owned reference behind every managed host handle.

use std::any::Any;

use host_api::PointerValue;

use crate::sys::{self, JSContext, JSRuntime, JSValue};

/// One strong reference to an engine value.
///
/// The reference is acquired when the handle is created and released exactly
/// once when it is dropped. Cloning takes a further reference to the same
/// engine value.
pub struct QuickJsPointerValue {
    rt: *mut JSRuntime,
    ctx: *mut JSContext,
    value: JSValue,
}

impl QuickJsPointerValue {
    /// Takes a new reference to a borrowed `value`.
    ///
    /// # Safety
    /// `ctx` must be live and `value` must belong to it.
    pub(crate) unsafe fn new(ctx: *mut JSContext, value: JSValue) -> Self {
        Self::from_owned(ctx, sys::dup(ctx, value))
    }

    /// Adopts a reference the caller already owns.
    ///
    /// # Safety
    /// `ctx` must be live and the caller must transfer ownership of `value`.
    pub(crate) unsafe fn from_owned(ctx: *mut JSContext, value: JSValue) -> Self {
        Self {
            rt: sys::qjs::JS_GetRuntime(ctx),
            ctx,
            value,
        }
    }

    /// Returns a fresh reference the caller must release.
    pub(crate) fn dereference(&self) -> JSValue {
        unsafe { sys::dup(self.ctx, self.value) }
    }

    /// Borrows the engine value without touching its reference count.
    pub(crate) fn raw(&self) -> JSValue {
        self.value
    }

    /// Engine reference count of the underlying value, when it has one.
    pub fn ref_count(&self) -> Option<i32> {
        sys::ref_count(self.value)
    }
}

impl PointerValue for QuickJsPointerValue {
    fn clone_pointer(&self) -> Box<dyn PointerValue> {
        Box::new(Self {
            rt: self.rt,
            ctx: self.ctx,
            value: self.dereference(),
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for QuickJsPointerValue {
    fn drop(&mut self) {
        unsafe { sys::free_rt(self.rt, self.value) }
    }
}

/// Recovers the engine handle behind a host handle.
///
/// # Panics
/// Panics when `ptr` was produced by a different runtime implementation.
pub(crate) fn pointer_of(ptr: &dyn PointerValue) -> &QuickJsPointerValue {
    match ptr.as_any().downcast_ref::<QuickJsPointerValue>() {
        Some(p) => p,
        None => panic!("handle does not belong to a QuickJS runtime"),
    }
}

/// Engine reference count behind any host handle created by this crate.
///
/// Returns `None` for foreign handles and for values without a count.
pub fn handle_ref_count(ptr: &dyn PointerValue) -> Option<i32> {
    ptr.as_any()
        .downcast_ref::<QuickJsPointerValue>()
        .and_then(QuickJsPointerValue::ref_count)
}
