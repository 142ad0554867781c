//! QuickJS implementation of the embedding contract.
//!
//! [`QuickJsRuntime`] owns one engine runtime and one context for its whole
//! life. The context keeps a back-pointer to the facade so host callbacks can
//! be handed a `&dyn Runtime`; that is why the facade is always pinned.

use std::ffi::{c_void, CStr, CString};
use std::marker::PhantomPinned;
use std::os::raw::{c_char, c_int};
use std::pin::Pin;
use std::ptr;
use std::rc::Rc;
use std::sync::Arc;

use host_api::{
    Array, ArrayBuffer, BigInt, Buffer, Function, HostFunction, HostObject, Instrumentation,
    JsError, JsString, JsiError, MutableBuffer, NativeState, Object, PreparedJavaScript,
    PropNameId, Result, Runtime, SourceJavaScriptPreparation, Symbol, Value, WeakObject,
};
use log::{debug, warn};
use num_traits::ToPrimitive;

use crate::code_cache::{CodeCache, CodeCacheState};
use crate::config::RuntimeConfig;
use crate::converter::{
    into_host_value, new_string, owned_handle, raw_of, to_engine_array, to_engine_bigint,
    to_engine_function, to_engine_object, to_engine_string, to_engine_symbol, to_engine_value,
    to_rust_string, EngineArgs,
};
use crate::host_proxy;
use crate::instrumentation::QuickJsInstrumentation;
use crate::scoped::{ScopedAtom, ScopedJsValue};
use crate::sys::{self, qjs, JSContext, JSRuntime, JSValue};

/// A QuickJS engine instance behind the [`Runtime`] contract.
///
/// Not `Send`: the engine and every handle it hands out belong to the thread
/// that created it. All handles must be dropped before the runtime.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use host_api::{Runtime, StringBuffer};
/// use quickjs_runtime::{QuickJsRuntime, RuntimeConfig};
///
/// let rt = QuickJsRuntime::new(RuntimeConfig::default().without_code_cache()).unwrap();
/// let result = rt.evaluate_javascript(Arc::new(StringBuffer::new("6 * 7")), "answer.js").unwrap();
/// assert_eq!(result.as_number(), Some(42.0));
/// ```
pub struct QuickJsRuntime {
    rt: *mut JSRuntime,
    ctx: *mut JSContext,
    config: RuntimeConfig,
    code_cache: Option<Arc<CodeCache>>,
    instrumentation: QuickJsInstrumentation,
    _runtime_info: CString,
    _pinned: PhantomPinned,
}

/// Builds a runtime with the default configuration.
pub fn create_quickjs_runtime() -> Result<Pin<Box<QuickJsRuntime>>> {
    QuickJsRuntime::new(RuntimeConfig::default())
}

impl QuickJsRuntime {
    /// Creates a runtime. The bytecode cache, if configured, is private to it.
    pub fn new(config: RuntimeConfig) -> Result<Pin<Box<Self>>> {
        let cache = config
            .code_cache_dir
            .clone()
            .map(|dir| Arc::new(CodeCache::new(dir)));
        Self::build(config, cache)
    }

    /// Creates a runtime that uses `cache` instead of `config.code_cache_dir`.
    pub fn with_code_cache(config: RuntimeConfig, cache: Arc<CodeCache>) -> Result<Pin<Box<Self>>> {
        Self::build(config, Some(cache))
    }

    fn build(config: RuntimeConfig, code_cache: Option<Arc<CodeCache>>) -> Result<Pin<Box<Self>>> {
        let runtime_info =
            CString::new(config.runtime_info.as_str()).map_err(|e| JsiError::Config(e.to_string()))?;

        let rt = unsafe { qjs::JS_NewRuntime() };
        if rt.is_null() {
            return Err(JsiError::Engine("could not allocate engine runtime".to_string()));
        }
        unsafe {
            qjs::JS_SetRuntimeInfo(rt, runtime_info.as_ptr());
            qjs::JS_SetMaxStackSize(rt, config.max_stack_size as _);
            if let Some(limit) = config.memory_limit {
                qjs::JS_SetMemoryLimit(rt, limit as _);
            }
            if let Some(threshold) = config.gc_threshold {
                qjs::JS_SetGCThreshold(rt, threshold as _);
            }
        }

        let ctx = unsafe { qjs::JS_NewContext(rt) };
        if ctx.is_null() {
            unsafe { qjs::JS_FreeRuntime(rt) };
            return Err(JsiError::Engine("could not allocate engine context".to_string()));
        }

        let runtime = Box::pin(Self {
            rt,
            ctx,
            code_cache,
            instrumentation: QuickJsInstrumentation::new(rt),
            _runtime_info: runtime_info,
            config,
            _pinned: PhantomPinned,
        });
        let back = &*runtime as *const Self as *mut c_void;
        unsafe { qjs::JS_SetContextOpaque(ctx, back) };
        debug!(
            "created {} (code cache: {:?})",
            runtime.config.runtime_info,
            runtime.code_cache.as_ref().map(|c| c.base_dir().to_path_buf())
        );
        Ok(runtime)
    }

    /// The facade that owns `ctx`, if it is still alive.
    ///
    /// # Safety
    /// `ctx` must be live.
    pub(crate) unsafe fn from_context<'a>(ctx: *mut JSContext) -> Option<&'a Self> {
        (qjs::JS_GetContextOpaque(ctx) as *const Self).as_ref()
    }

    /// The engine context. Valid for as long as `self` is.
    pub(crate) fn context(&self) -> *mut JSContext {
        self.ctx
    }

    /// This runtime as a contract object.
    pub fn as_runtime(&self) -> &dyn Runtime {
        self
    }

    /// Configuration the runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The bytecode cache, when enabled.
    pub fn code_cache(&self) -> Option<&Arc<CodeCache>> {
        self.code_cache.as_ref()
    }

    // Exception slot

    /// Moves the pending exception, if any, out of the engine.
    fn take_exception(&self) -> Option<JsError> {
        let ctx = self.ctx;
        let exc = unsafe { qjs::JS_GetException(ctx) };
        // An empty slot reads as uninitialized; a thrown `null` is a real value.
        if sys::tag(exc) == sys::TAG_UNINITIALIZED {
            return None;
        }
        let exc = ScopedJsValue::new(ctx, exc);

        let message = unsafe { to_rust_string(ctx, exc.get()) }.unwrap_or_else(|| {
            // Rendering threw; drop that secondary exception.
            unsafe { sys::free(ctx, qjs::JS_GetException(ctx)) };
            "<unprintable exception>".to_string()
        });
        let stack = if sys::flag(unsafe { qjs::JS_IsError(ctx, exc.get()) }) {
            let stack = ScopedJsValue::new(ctx, unsafe {
                qjs::JS_GetPropertyStr(ctx, exc.get(), c"stack".as_ptr())
            });
            if sys::tag(stack.get()) == sys::TAG_STRING {
                unsafe { to_rust_string(ctx, stack.get()) }
            } else {
                if sys::is_exception(stack.get()) {
                    unsafe { sys::free(ctx, qjs::JS_GetException(ctx)) };
                }
                None
            }
        } else {
            None
        };

        debug!("script exception: {}", message);
        let value = unsafe { into_host_value(ctx, exc.release()) };
        let error = JsError::new(value, message);
        Some(match stack {
            Some(stack) if !stack.is_empty() => error.with_stack(stack),
            _ => error,
        })
    }

    /// The error to report after the engine signalled an exception.
    fn raise(&self) -> JsiError {
        match self.take_exception() {
            Some(err) => JsiError::Js(err),
            None => JsiError::host("engine signalled an exception without a pending value"),
        }
    }

    /// Wraps an owned engine result, failing if it is the exception sentinel.
    fn checked(&self, value: JSValue) -> Result<ScopedJsValue> {
        if sys::is_exception(value) {
            Err(self.raise())
        } else {
            Ok(ScopedJsValue::new(self.ctx, value))
        }
    }

    /// Fails if an engine status code is negative.
    fn checked_status(&self, status: c_int) -> Result<c_int> {
        if status < 0 {
            Err(self.raise())
        } else {
            Ok(status)
        }
    }

    // Conversions

    fn host_value(&self, value: ScopedJsValue) -> Value {
        unsafe { into_host_value(self.ctx, value.release()) }
    }

    fn object(&self, value: ScopedJsValue) -> Object {
        Object::from_pointer(unsafe { owned_handle(self.ctx, value.release()) })
    }

    fn scoped(&self, value: JSValue) -> ScopedJsValue {
        ScopedJsValue::new(self.ctx, value)
    }

    fn atom(&self, key: JSValue) -> Result<ScopedAtom> {
        ScopedAtom::from_value(self.ctx, key).ok_or_else(|| self.raise())
    }

    fn rust_string(&self, value: JSValue) -> Result<String> {
        unsafe { to_rust_string(self.ctx, value) }.ok_or_else(|| self.raise())
    }

    /// `globalThis[name]`.
    fn global_member(&self, name: &CStr) -> Result<ScopedJsValue> {
        let global = self.scoped(unsafe { qjs::JS_GetGlobalObject(self.ctx) });
        self.checked(unsafe { qjs::JS_GetPropertyStr(self.ctx, global.get(), name.as_ptr()) })
    }

    fn call_raw(&self, func: JSValue, this: JSValue, args: &[Value]) -> Result<ScopedJsValue> {
        let mut argv = unsafe { EngineArgs::new(self.ctx, args) };
        self.checked(unsafe { qjs::JS_Call(self.ctx, func, this, argv.len(), argv.as_mut_ptr()) })
    }

    // Evaluation

    fn evaluate_source(&self, source: &[u8], source_url: &str) -> Result<Value> {
        let ctx = self.ctx;
        let filename = CString::new(source_url)
            .map_err(|_| JsiError::host(format!("source url {:?} contains NUL", source_url)))?;
        // The engine expects a terminating NUL past `len`.
        let mut text = Vec::with_capacity(source.len() + 1);
        text.extend_from_slice(source);
        text.push(0);
        let eval = |flags: c_int| unsafe {
            qjs::JS_Eval(
                ctx,
                text.as_ptr() as *const c_char,
                source.len() as _,
                filename.as_ptr(),
                flags,
            )
        };

        let Some(cache) = &self.code_cache else {
            let result = self.checked(eval(sys::EVAL_GLOBAL))?;
            self.drain_microtasks(-1)?;
            return Ok(self.host_value(result));
        };

        let mut item = cache.load(source_url);
        let mut unit = None;
        if item.state() == CodeCacheState::Initialized {
            let read = unsafe {
                qjs::JS_ReadObject(ctx, item.data().as_ptr(), item.size() as _, sys::READ_BYTECODE)
            };
            if sys::is_exception(read) {
                warn!(
                    "ignoring unreadable code cache for {}: {}",
                    source_url,
                    self.raise()
                );
                cache.record_rejected();
            } else {
                unit = Some(self.scoped(read));
            }
        }

        let (unit, for_cache) = match unit {
            Some(unit) => (unit, None),
            None => {
                let compiled = self.checked(eval(sys::EVAL_COMPILE_ONLY))?;
                let for_cache = self.scoped(compiled.dup());
                (compiled, Some(for_cache))
            }
        };

        let result = self.checked(unsafe { qjs::JS_EvalFunction(ctx, unit.release()) })?;
        self.drain_microtasks(-1)?;

        if let Some(compiled) = for_cache {
            item.request_update(self.serialize(&compiled)?);
            cache.store(source_url, &mut item)?;
        }
        Ok(self.host_value(result))
    }

    fn serialize(&self, unit: &ScopedJsValue) -> Result<Vec<u8>> {
        let mut size: qjs::size_t = 0;
        let bytes =
            unsafe { qjs::JS_WriteObject(self.ctx, &mut size, unit.get(), sys::WRITE_BYTECODE) };
        if bytes.is_null() {
            let reason = self
                .take_exception()
                .map(|e| e.message().to_string())
                .unwrap_or_else(|| "engine returned no bytecode".to_string());
            return Err(JsiError::BytecodeSerialization(reason));
        }
        let data = unsafe { std::slice::from_raw_parts(bytes as *const u8, size as usize) }.to_vec();
        unsafe { qjs::js_free(self.ctx, bytes as *mut c_void) };
        if data.is_empty() {
            return Err(JsiError::BytecodeSerialization(
                "engine returned empty bytecode".to_string(),
            ));
        }
        Ok(data)
    }

    fn new_prop_name(&self, utf8: &[u8]) -> PropNameId {
        let text = String::from_utf8_lossy(utf8);
        PropNameId::from_pointer(unsafe {
            owned_handle(self.ctx, new_string(self.ctx, text.as_bytes()))
        })
    }

    fn bigint_value(&self, value: &BigInt) -> Result<num_bigint::BigInt> {
        let text = self.rust_string(raw_of(value.pointer()))?;
        text.parse()
            .map_err(|e| JsiError::host(format!("malformed big integer {:?}: {}", text, e)))
    }

    fn index(index: usize) -> Result<u32> {
        u32::try_from(index).map_err(|_| JsiError::host(format!("array index {} out of range", index)))
    }
}

impl Runtime for QuickJsRuntime {
    fn evaluate_javascript(&self, buffer: Arc<dyn Buffer>, source_url: &str) -> Result<Value> {
        self.evaluate_source(buffer.data(), source_url)
    }

    fn prepare_javascript(
        &self,
        buffer: Arc<dyn Buffer>,
        source_url: String,
    ) -> Result<Arc<dyn PreparedJavaScript>> {
        Ok(Arc::new(SourceJavaScriptPreparation::new(buffer, source_url)))
    }

    fn evaluate_prepared_javascript(
        &self,
        prepared: &Arc<dyn PreparedJavaScript>,
    ) -> Result<Value> {
        self.evaluate_source(prepared.buffer().data(), prepared.source_url())
    }

    fn drain_microtasks(&self, max_hint: i32) -> Result<bool> {
        let mut executed = 0;
        while max_hint < 0 || executed < max_hint {
            let mut job_ctx: *mut JSContext = ptr::null_mut();
            let status = unsafe { qjs::JS_ExecutePendingJob(self.rt, &mut job_ctx) };
            self.checked_status(status)?;
            if status == 0 {
                return Ok(true);
            }
            executed += 1;
        }
        Ok(!sys::flag(unsafe { qjs::JS_IsJobPending(self.rt) }))
    }

    fn global(&self) -> Object {
        self.object(self.scoped(unsafe { qjs::JS_GetGlobalObject(self.ctx) }))
    }

    fn description(&self) -> String {
        self.config.runtime_info.clone()
    }

    fn is_inspectable(&self) -> bool {
        false
    }

    fn instrumentation(&self) -> &dyn Instrumentation {
        &self.instrumentation
    }

    fn create_prop_name_id_from_ascii(&self, ascii: &[u8]) -> PropNameId {
        self.new_prop_name(ascii)
    }

    fn create_prop_name_id_from_utf8(&self, utf8: &[u8]) -> PropNameId {
        self.new_prop_name(utf8)
    }

    fn create_prop_name_id_from_string(&self, name: &JsString) -> Result<PropNameId> {
        Ok(PropNameId::from_pointer(unsafe {
            owned_handle(self.ctx, to_engine_string(name))
        }))
    }

    fn create_prop_name_id_from_symbol(&self, sym: &Symbol) -> Result<PropNameId> {
        Ok(PropNameId::from_pointer(unsafe {
            owned_handle(self.ctx, to_engine_symbol(sym))
        }))
    }

    fn prop_name_id_utf8(&self, name: &PropNameId) -> Result<String> {
        let atom = self.atom(raw_of(name.pointer()))?;
        let text = self.checked(unsafe { qjs::JS_AtomToString(self.ctx, atom.get()) })?;
        self.rust_string(text.get())
    }

    fn prop_name_id_equals(&self, a: &PropNameId, b: &PropNameId) -> Result<bool> {
        let a = self.atom(raw_of(a.pointer()))?;
        let b = self.atom(raw_of(b.pointer()))?;
        Ok(a.get() == b.get())
    }

    fn create_string_from_ascii(&self, ascii: &[u8]) -> JsString {
        self.create_string_from_utf8(ascii)
    }

    fn create_string_from_utf8(&self, utf8: &[u8]) -> JsString {
        let text = String::from_utf8_lossy(utf8);
        JsString::from_pointer(unsafe {
            owned_handle(self.ctx, new_string(self.ctx, text.as_bytes()))
        })
    }

    fn string_utf8(&self, s: &JsString) -> Result<String> {
        self.rust_string(raw_of(s.pointer()))
    }

    fn symbol_to_string(&self, sym: &Symbol) -> Result<String> {
        let string_fn = self.global_member(c"String")?;
        let undefined = sys::undefined();
        let rendered = self.call_raw(string_fn.get(), undefined, &[Value::Symbol(sym.clone())])?;
        self.rust_string(rendered.get())
    }

    fn create_bigint_from_i64(&self, value: i64) -> BigInt {
        BigInt::from_pointer(unsafe {
            owned_handle(self.ctx, qjs::JS_NewBigInt64(self.ctx, value))
        })
    }

    fn create_bigint_from_u64(&self, value: u64) -> BigInt {
        BigInt::from_pointer(unsafe {
            owned_handle(self.ctx, qjs::JS_NewBigUint64(self.ctx, value))
        })
    }

    fn bigint_is_int64(&self, value: &BigInt) -> Result<bool> {
        Ok(self.bigint_value(value)?.to_i64().is_some())
    }

    fn bigint_is_uint64(&self, value: &BigInt) -> Result<bool> {
        Ok(self.bigint_value(value)?.to_u64().is_some())
    }

    fn truncate(&self, value: &BigInt) -> Result<u64> {
        let raw = self.scoped(to_engine_bigint(value));
        let mut out = 0i64;
        self.checked_status(unsafe { qjs::JS_ToBigInt64(self.ctx, &mut out, raw.get()) })?;
        Ok(out as u64)
    }

    fn bigint_to_string(&self, value: &BigInt, radix: u32) -> Result<JsString> {
        let raw = raw_of(value.pointer());
        let to_string =
            self.checked(unsafe { qjs::JS_GetPropertyStr(self.ctx, raw, c"toString".as_ptr()) })?;
        let rendered = self.call_raw(to_string.get(), raw, &[Value::Number(radix as f64)])?;
        match self.host_value(rendered) {
            Value::String(s) => Ok(s),
            _ => Err(JsiError::host("BigInt toString did not return a string")),
        }
    }

    fn create_object(&self) -> Object {
        self.object(self.scoped(unsafe { qjs::JS_NewObject(self.ctx) }))
    }

    fn create_object_with_host_object(&self, host: Rc<dyn HostObject>) -> Result<Object> {
        let obj = unsafe { host_proxy::create_host_object(self.ctx, host)? };
        Ok(self.object(self.scoped(obj)))
    }

    fn get_host_object(&self, obj: &Object) -> Option<Rc<dyn HostObject>> {
        unsafe { host_proxy::host_object_of(raw_of(obj.pointer())) }
    }

    fn get_host_function(&self, func: &Function) -> Option<HostFunction> {
        unsafe { host_proxy::host_function_of(raw_of(func.as_object().pointer())) }
    }

    fn has_native_state(&self, obj: &Object) -> bool {
        unsafe { host_proxy::opaque_slot_of(raw_of(obj.pointer())) }
            .map(|slot| slot.native_state.is_some())
            .unwrap_or(false)
    }

    fn get_native_state(&self, obj: &Object) -> Option<NativeState> {
        unsafe { host_proxy::opaque_slot_of(raw_of(obj.pointer())) }
            .and_then(|slot| slot.native_state.clone())
    }

    fn set_native_state(&self, obj: &Object, state: NativeState) -> Result<()> {
        match unsafe { host_proxy::opaque_slot_of(raw_of(obj.pointer())) } {
            Some(slot) => {
                let previous = slot.native_state.replace(state);
                drop(previous);
                Ok(())
            }
            None => Err(JsiError::NotImplemented(
                "native state on objects not created from a host object or host function",
            )),
        }
    }

    fn get_property(&self, obj: &Object, name: &PropNameId) -> Result<Value> {
        let atom = self.atom(raw_of(name.pointer()))?;
        let value = self.checked(unsafe {
            qjs::JS_GetProperty(self.ctx, raw_of(obj.pointer()), atom.get())
        })?;
        Ok(self.host_value(value))
    }

    fn get_property_by_string(&self, obj: &Object, name: &JsString) -> Result<Value> {
        let atom = self.atom(raw_of(name.pointer()))?;
        let value = self.checked(unsafe {
            qjs::JS_GetProperty(self.ctx, raw_of(obj.pointer()), atom.get())
        })?;
        Ok(self.host_value(value))
    }

    fn has_property(&self, obj: &Object, name: &PropNameId) -> Result<bool> {
        let atom = self.atom(raw_of(name.pointer()))?;
        let found = self.checked_status(unsafe {
            qjs::JS_HasProperty(self.ctx, raw_of(obj.pointer()), atom.get())
        })?;
        Ok(found != 0)
    }

    fn has_property_by_string(&self, obj: &Object, name: &JsString) -> Result<bool> {
        let atom = self.atom(raw_of(name.pointer()))?;
        let found = self.checked_status(unsafe {
            qjs::JS_HasProperty(self.ctx, raw_of(obj.pointer()), atom.get())
        })?;
        Ok(found != 0)
    }

    fn set_property_value(&self, obj: &Object, name: &PropNameId, value: &Value) -> Result<()> {
        let atom = self.atom(raw_of(name.pointer()))?;
        self.checked_status(unsafe {
            qjs::JS_SetProperty(
                self.ctx,
                raw_of(obj.pointer()),
                atom.get(),
                to_engine_value(self.ctx, value),
            )
        })?;
        Ok(())
    }

    fn set_property_value_by_string(
        &self,
        obj: &Object,
        name: &JsString,
        value: &Value,
    ) -> Result<()> {
        let atom = self.atom(raw_of(name.pointer()))?;
        self.checked_status(unsafe {
            qjs::JS_SetProperty(
                self.ctx,
                raw_of(obj.pointer()),
                atom.get(),
                to_engine_value(self.ctx, value),
            )
        })?;
        Ok(())
    }

    fn is_array(&self, obj: &Object) -> bool {
        let check = || -> Result<bool> {
            let array_ctor = self.global_member(c"Array")?;
            let is_array = self.checked(unsafe {
                qjs::JS_GetPropertyStr(self.ctx, array_ctor.get(), c"isArray".as_ptr())
            })?;
            let result = self.call_raw(
                is_array.get(),
                array_ctor.get(),
                std::slice::from_ref(&Value::Object(obj.clone())),
            )?;
            Ok(sys::tag(result.get()) == sys::TAG_BOOL && sys::get_bool(result.get()))
        };
        check().unwrap_or(false)
    }

    fn is_array_buffer(&self, obj: &Object) -> bool {
        let Ok(ctor) = self.global_member(c"ArrayBuffer") else {
            return false;
        };
        let status = unsafe { qjs::JS_IsInstanceOf(self.ctx, raw_of(obj.pointer()), ctor.get()) };
        self.checked_status(status).map(|s| s > 0).unwrap_or(false)
    }

    fn is_function(&self, obj: &Object) -> bool {
        sys::flag(unsafe { qjs::JS_IsFunction(self.ctx, raw_of(obj.pointer())) })
    }

    fn is_host_object(&self, obj: &Object) -> bool {
        self.get_host_object(obj).is_some()
    }

    fn is_host_function(&self, func: &Function) -> bool {
        self.get_host_function(func).is_some()
    }

    fn get_property_names(&self, obj: &Object) -> Result<Array> {
        let object_ctor = self.global_member(c"Object")?;
        let keys = self.checked(unsafe {
            qjs::JS_GetPropertyStr(self.ctx, object_ctor.get(), c"keys".as_ptr())
        })?;
        let names = self.call_raw(
            keys.get(),
            object_ctor.get(),
            std::slice::from_ref(&Value::Object(obj.clone())),
        )?;
        Ok(Array::from_object_unchecked(self.object(names)))
    }

    fn create_weak_object(&self, _obj: &Object) -> Result<WeakObject> {
        Err(JsiError::NotImplemented("weak objects"))
    }

    fn lock_weak_object(&self, _weak: &WeakObject) -> Result<Value> {
        Err(JsiError::NotImplemented("weak objects"))
    }

    fn create_array(&self, length: usize) -> Result<Array> {
        let array = self.checked(unsafe { qjs::JS_NewArray(self.ctx) })?;
        if length > 0 {
            self.checked_status(unsafe {
                qjs::JS_SetPropertyStr(
                    self.ctx,
                    array.get(),
                    c"length".as_ptr(),
                    sys::new_number(length as f64),
                )
            })?;
        }
        Ok(Array::from_object_unchecked(self.object(array)))
    }

    fn create_array_buffer(&self, _buffer: Arc<MutableBuffer>) -> Result<ArrayBuffer> {
        Err(JsiError::NotImplemented("array buffers"))
    }

    fn array_size(&self, array: &Array) -> Result<usize> {
        let array = self.scoped(to_engine_array(array));
        let length = self.checked(unsafe {
            qjs::JS_GetPropertyStr(self.ctx, array.get(), c"length".as_ptr())
        })?;
        match self.host_value(length) {
            Value::Number(n) if n >= 0.0 => Ok(n as usize),
            _ => Err(JsiError::host("array length is not a non-negative number")),
        }
    }

    fn array_buffer_size(&self, _buffer: &ArrayBuffer) -> Result<usize> {
        Err(JsiError::NotImplemented("array buffers"))
    }

    fn array_buffer_data(&self, _buffer: &ArrayBuffer) -> Result<Vec<u8>> {
        Err(JsiError::NotImplemented("array buffers"))
    }

    fn get_value_at_index(&self, array: &Array, index: usize) -> Result<Value> {
        let index = Self::index(index)?;
        let array = self.scoped(to_engine_array(array));
        let value = self.checked(unsafe {
            qjs::JS_GetPropertyUint32(self.ctx, array.get(), index)
        })?;
        Ok(self.host_value(value))
    }

    fn set_value_at_index(&self, array: &Array, index: usize, value: &Value) -> Result<()> {
        let index = Self::index(index)?;
        let array = self.scoped(to_engine_array(array));
        self.checked_status(unsafe {
            qjs::JS_SetPropertyUint32(
                self.ctx,
                array.get(),
                index,
                to_engine_value(self.ctx, value),
            )
        })?;
        Ok(())
    }

    fn create_function_from_host_function(
        &self,
        name: &PropNameId,
        param_count: u32,
        func: HostFunction,
    ) -> Result<Function> {
        let function = self.scoped(unsafe { host_proxy::create_host_function(self.ctx, func)? });
        let name = self.prop_name_id_utf8(name)?;
        unsafe {
            self.checked_status(qjs::JS_DefinePropertyValueStr(
                self.ctx,
                function.get(),
                c"name".as_ptr(),
                new_string(self.ctx, name.as_bytes()),
                sys::PROP_CONFIGURABLE,
            ))?;
            self.checked_status(qjs::JS_DefinePropertyValueStr(
                self.ctx,
                function.get(),
                c"length".as_ptr(),
                sys::new_number(param_count as f64),
                sys::PROP_CONFIGURABLE,
            ))?;
        }
        Ok(Function::from_object_unchecked(self.object(function)))
    }

    fn call(&self, func: &Function, this: &Value, args: &[Value]) -> Result<Value> {
        let this = match this {
            Value::Undefined => self.scoped(unsafe { qjs::JS_GetGlobalObject(self.ctx) }),
            other => self.scoped(unsafe { to_engine_value(self.ctx, other) }),
        };
        let func = self.scoped(to_engine_function(func));
        let result = self.call_raw(func.get(), this.get(), args)?;
        Ok(self.host_value(result))
    }

    fn call_as_constructor(&self, func: &Function, args: &[Value]) -> Result<Value> {
        let func = self.scoped(to_engine_function(func));
        let mut argv = unsafe { EngineArgs::new(self.ctx, args) };
        let result = self.checked(unsafe {
            qjs::JS_CallConstructor(self.ctx, func.get(), argv.len(), argv.as_mut_ptr())
        })?;
        Ok(self.host_value(result))
    }

    fn strict_equals_symbol(&self, a: &Symbol, b: &Symbol) -> bool {
        sys::flag(unsafe {
            qjs::JS_IsStrictEqual(self.ctx, raw_of(a.pointer()), raw_of(b.pointer()))
        })
    }

    fn strict_equals_bigint(&self, a: &BigInt, b: &BigInt) -> bool {
        sys::flag(unsafe {
            qjs::JS_IsStrictEqual(self.ctx, raw_of(a.pointer()), raw_of(b.pointer()))
        })
    }

    fn strict_equals_string(&self, a: &JsString, b: &JsString) -> bool {
        sys::flag(unsafe {
            qjs::JS_IsStrictEqual(self.ctx, raw_of(a.pointer()), raw_of(b.pointer()))
        })
    }

    fn strict_equals_object(&self, a: &Object, b: &Object) -> bool {
        sys::flag(unsafe {
            qjs::JS_IsStrictEqual(self.ctx, raw_of(a.pointer()), raw_of(b.pointer()))
        })
    }

    fn instance_of(&self, obj: &Object, ctor: &Function) -> Result<bool> {
        let ctor = self.scoped(to_engine_object(ctor.as_object()));
        let status = self.checked_status(unsafe {
            qjs::JS_IsInstanceOf(self.ctx, raw_of(obj.pointer()), ctor.get())
        })?;
        Ok(status > 0)
    }
}

impl Drop for QuickJsRuntime {
    fn drop(&mut self) {
        if let Err(err) = self.drain_microtasks(-1) {
            warn!("pending job failed while shutting down: {}", err);
        }
        unsafe {
            qjs::JS_SetContextOpaque(self.ctx, ptr::null_mut());
            qjs::JS_FreeContext(self.ctx);
            qjs::JS_FreeRuntime(self.rt);
        }
        debug!("released {}", self.config.runtime_info);
    }
}
