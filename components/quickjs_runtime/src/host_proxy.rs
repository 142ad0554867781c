//! Host objects and host functions as native engine objects.
//!
//! Each proxy kind is an engine class. The class id is allocated once per
//! process, the class is registered once per engine runtime, and every
//! context shares one prototype per class. Instances carry an [`OpaqueSlot`]
//! as their engine opaque pointer; the engine finalizer frees the proxy.
//!
//! Trampolines never unwind into the engine. A host `Err(JsiError::Js)` is
//! thrown into the engine; any other error or a panic is logged and replaced
//! by `undefined` (or a successful write).

use std::any::Any;
use std::ffi::c_void;
use std::mem;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::rc::Rc;
use std::sync::OnceLock;

use host_api::{HostFunction, HostObject, JsiError, NativeState, Result, Value};
use log::warn;

use crate::converter::{self, host_args, to_engine_value, to_host_value, to_prop_name_id};
use crate::runtime::QuickJsRuntime;
use crate::scoped::ScopedJsValue;
use crate::sys::{self, qjs, JSAtom, JSClassID, JSContext, JSRuntime, JSValue};

/// Side record attached to every proxy-created engine object.
pub(crate) struct OpaqueSlot {
    /// Back-pointer to the owning proxy. Lookup only.
    host_data: *mut c_void,
    /// State the host attached with `set_native_state`.
    pub(crate) native_state: Option<NativeState>,
}

#[repr(C)]
struct HostObjectProxy {
    slot: OpaqueSlot,
    host: Rc<dyn HostObject>,
}

#[repr(C)]
struct HostFunctionProxy {
    slot: OpaqueSlot,
    func: HostFunction,
}

// Process-wide class ids, allocated on first use and never released.
static OBJECT_CLASS_ID: OnceLock<JSClassID> = OnceLock::new();
static FUNCTION_CLASS_ID: OnceLock<JSClassID> = OnceLock::new();

struct ExoticMethods(qjs::JSClassExoticMethods);

// Only holds function pointers.
unsafe impl Send for ExoticMethods {}
unsafe impl Sync for ExoticMethods {}

static OBJECT_EXOTIC: OnceLock<ExoticMethods> = OnceLock::new();

fn class_id(cell: &OnceLock<JSClassID>, rt: *mut JSRuntime) -> JSClassID {
    *cell.get_or_init(|| {
        let mut id: JSClassID = 0;
        unsafe { qjs::JS_NewClassID(rt, &mut id) }
    })
}

fn object_exotic() -> *mut qjs::JSClassExoticMethods {
    let methods = OBJECT_EXOTIC.get_or_init(|| {
        let mut em: qjs::JSClassExoticMethods = unsafe { mem::zeroed() };
        em.get_own_property = Some(object_get_own_property);
        em.get_own_property_names = Some(object_get_own_property_names);
        em.get_property = Some(object_get_property);
        em.set_property = Some(object_set_property);
        ExoticMethods(em)
    });
    // The engine only reads through this pointer.
    &methods.0 as *const qjs::JSClassExoticMethods as *mut _
}

/// Registers `id` with `rt` unless it already is, returning false on failure.
unsafe fn ensure_class(rt: *mut JSRuntime, id: JSClassID, kind: ProxyKind) -> bool {
    if sys::flag(qjs::JS_IsRegisteredClass(rt, id)) {
        return true;
    }
    let mut def: qjs::JSClassDef = mem::zeroed();
    match kind {
        ProxyKind::Object => {
            def.class_name = c"HostObject".as_ptr() as *const c_char;
            def.finalizer = Some(object_finalize);
            def.exotic = object_exotic();
        }
        ProxyKind::Function => {
            def.class_name = c"HostFunction".as_ptr() as *const c_char;
            def.finalizer = Some(function_finalize);
            def.call = Some(function_call);
        }
    }
    qjs::JS_NewClass(rt, id, &def) == 0
}

#[derive(Clone, Copy)]
enum ProxyKind {
    Object,
    Function,
}

impl ProxyKind {
    fn class_id(self, rt: *mut JSRuntime) -> JSClassID {
        match self {
            ProxyKind::Object => class_id(&OBJECT_CLASS_ID, rt),
            ProxyKind::Function => class_id(&FUNCTION_CLASS_ID, rt),
        }
    }
}

/// Creates an engine object of the proxy class with `slot` as its opaque.
///
/// On failure the caller still owns the proxy.
unsafe fn new_instance(
    ctx: *mut JSContext,
    kind: ProxyKind,
    slot: *mut OpaqueSlot,
) -> Option<JSValue> {
    let rt = qjs::JS_GetRuntime(ctx);
    let id = kind.class_id(rt);
    if !ensure_class(rt, id, kind) {
        return None;
    }

    let mut proto = qjs::JS_GetClassProto(ctx, id);
    if sys::tag(proto) != sys::TAG_OBJECT {
        sys::free(ctx, proto);
        proto = qjs::JS_NewObject(ctx);
        if sys::is_exception(proto) {
            return None;
        }
        qjs::JS_SetClassProto(ctx, id, sys::dup(ctx, proto));
    }
    let proto = ScopedJsValue::new(ctx, proto);

    let obj = qjs::JS_NewObjectProtoClass(ctx, proto.get(), id);
    if sys::is_exception(obj) {
        return None;
    }
    let _ = qjs::JS_SetOpaque(obj, slot as *mut c_void);
    Some(obj)
}

/// Wraps `host` in a new engine object. Returns an owned value.
///
/// # Safety
/// `ctx` must be live.
pub(crate) unsafe fn create_host_object(
    ctx: *mut JSContext,
    host: Rc<dyn HostObject>,
) -> Result<JSValue> {
    let proxy = Box::into_raw(Box::new(HostObjectProxy {
        slot: OpaqueSlot {
            host_data: ptr::null_mut(),
            native_state: None,
        },
        host,
    }));
    (*proxy).slot.host_data = proxy as *mut c_void;
    match new_instance(ctx, ProxyKind::Object, ptr::addr_of_mut!((*proxy).slot)) {
        Some(obj) => Ok(obj),
        None => {
            drop(Box::from_raw(proxy));
            Err(JsiError::Engine("failed to create host object".to_string()))
        }
    }
}

/// Wraps `func` in a new callable engine object. Returns an owned value.
///
/// # Safety
/// `ctx` must be live.
pub(crate) unsafe fn create_host_function(
    ctx: *mut JSContext,
    func: HostFunction,
) -> Result<JSValue> {
    let proxy = Box::into_raw(Box::new(HostFunctionProxy {
        slot: OpaqueSlot {
            host_data: ptr::null_mut(),
            native_state: None,
        },
        func,
    }));
    (*proxy).slot.host_data = proxy as *mut c_void;
    match new_instance(ctx, ProxyKind::Function, ptr::addr_of_mut!((*proxy).slot)) {
        Some(obj) => Ok(obj),
        None => {
            drop(Box::from_raw(proxy));
            Err(JsiError::Engine("failed to create host function".to_string()))
        }
    }
}

fn registered_id(cell: &OnceLock<JSClassID>) -> Option<JSClassID> {
    cell.get().copied()
}

unsafe fn slot_for(value: JSValue, cell: &OnceLock<JSClassID>) -> *mut OpaqueSlot {
    if sys::tag(value) != sys::TAG_OBJECT {
        return ptr::null_mut();
    }
    match registered_id(cell) {
        Some(id) => qjs::JS_GetOpaque(value, id) as *mut OpaqueSlot,
        None => ptr::null_mut(),
    }
}

unsafe fn object_proxy<'a>(value: JSValue) -> Option<&'a HostObjectProxy> {
    let slot = slot_for(value, &OBJECT_CLASS_ID);
    if slot.is_null() || (*slot).host_data.is_null() {
        None
    } else {
        Some(&*((*slot).host_data as *const HostObjectProxy))
    }
}

unsafe fn function_proxy<'a>(value: JSValue) -> Option<&'a HostFunctionProxy> {
    let slot = slot_for(value, &FUNCTION_CLASS_ID);
    if slot.is_null() || (*slot).host_data.is_null() {
        None
    } else {
        Some(&*((*slot).host_data as *const HostFunctionProxy))
    }
}

/// The host object behind a borrowed engine value.
///
/// # Safety
/// `value` must be live.
pub(crate) unsafe fn host_object_of(value: JSValue) -> Option<Rc<dyn HostObject>> {
    object_proxy(value).map(|proxy| proxy.host.clone())
}

/// The host closure behind a borrowed engine value.
///
/// # Safety
/// `value` must be live.
pub(crate) unsafe fn host_function_of(value: JSValue) -> Option<HostFunction> {
    function_proxy(value).map(|proxy| proxy.func.clone())
}

/// The opaque slot of either proxy kind.
///
/// # Safety
/// `value` must be live, and the returned borrow must end before the engine
/// can finalize the object.
pub(crate) unsafe fn opaque_slot_of<'a>(value: JSValue) -> Option<&'a mut OpaqueSlot> {
    let slot = slot_for(value, &OBJECT_CLASS_ID);
    let slot = if slot.is_null() {
        slot_for(value, &FUNCTION_CLASS_ID)
    } else {
        slot
    };
    slot.as_mut()
}

/// Turns a host outcome into an engine return value.
unsafe fn finish_value(
    ctx: *mut JSContext,
    what: &str,
    outcome: std::thread::Result<Result<Value>>,
) -> JSValue {
    match outcome {
        Ok(Ok(value)) => to_engine_value(ctx, &value),
        Ok(Err(JsiError::Js(err))) => qjs::JS_Throw(ctx, to_engine_value(ctx, err.value())),
        Ok(Err(err)) => {
            warn!("{} failed, returning undefined: {}", what, err);
            sys::undefined()
        }
        Err(panic) => {
            warn!("{} panicked, returning undefined: {}", what, panic_message(&*panic));
            sys::undefined()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic>"
    }
}

unsafe extern "C" fn object_get_property(
    ctx: *mut JSContext,
    obj: JSValue,
    atom: JSAtom,
    _receiver: JSValue,
) -> JSValue {
    let (Some(rt), Some(proxy)) = (QuickJsRuntime::from_context(ctx), object_proxy(obj)) else {
        return sys::undefined();
    };
    let host = proxy.host.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let name = to_prop_name_id(ctx, atom);
        host.get(rt, &name)
    }));
    finish_value(ctx, "host object get", outcome)
}

unsafe extern "C" fn object_set_property(
    ctx: *mut JSContext,
    obj: JSValue,
    atom: JSAtom,
    value: JSValue,
    _receiver: JSValue,
    _flags: c_int,
) -> c_int {
    let (Some(rt), Some(proxy)) = (QuickJsRuntime::from_context(ctx), object_proxy(obj)) else {
        return 1;
    };
    let host = proxy.host.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let name = to_prop_name_id(ctx, atom);
        let value = to_host_value(ctx, value);
        host.set(rt, &name, &value)
    }));
    match outcome {
        Ok(Ok(())) => 1,
        Ok(Err(JsiError::Js(err))) => {
            qjs::JS_Throw(ctx, to_engine_value(ctx, err.value()));
            -1
        }
        Ok(Err(err)) => {
            warn!("host object set failed, ignoring: {}", err);
            1
        }
        Err(panic) => {
            warn!("host object set panicked, ignoring: {}", panic_message(&*panic));
            1
        }
    }
}

/// Atoms of the host's property names, in the host's order.
unsafe fn host_name_atoms(
    ctx: *mut JSContext,
    rt: &QuickJsRuntime,
    host: &Rc<dyn HostObject>,
) -> Vec<JSAtom> {
    let names = match catch_unwind(AssertUnwindSafe(|| host.get_property_names(rt))) {
        Ok(names) => names,
        Err(panic) => {
            warn!("host object enumeration panicked: {}", panic_message(&*panic));
            Vec::new()
        }
    };
    names
        .iter()
        .filter_map(|name| {
            let key = ScopedJsValue::new(ctx, converter::to_engine_prop_name(name));
            let atom = qjs::JS_ValueToAtom(ctx, key.get());
            (atom != 0).then_some(atom)
        })
        .collect()
}

unsafe extern "C" fn object_get_own_property_names(
    ctx: *mut JSContext,
    ptab: *mut *mut qjs::JSPropertyEnum,
    plen: *mut u32,
    obj: JSValue,
) -> c_int {
    *ptab = ptr::null_mut();
    *plen = 0;
    let (Some(rt), Some(proxy)) = (QuickJsRuntime::from_context(ctx), object_proxy(obj)) else {
        return 0;
    };
    let atoms = host_name_atoms(ctx, rt, &proxy.host.clone());

    let bytes = mem::size_of::<qjs::JSPropertyEnum>() * atoms.len().max(1);
    let tab = qjs::js_malloc(ctx, bytes as _) as *mut qjs::JSPropertyEnum;
    if tab.is_null() {
        for atom in atoms {
            qjs::JS_FreeAtom(ctx, atom);
        }
        return -1;
    }
    for (i, atom) in atoms.iter().enumerate() {
        let entry = tab.add(i);
        ptr::write(entry, mem::zeroed());
        (*entry).is_enumerable = true.into();
        (*entry).atom = *atom;
    }
    *ptab = tab;
    *plen = atoms.len() as u32;
    0
}

unsafe extern "C" fn object_get_own_property(
    ctx: *mut JSContext,
    desc: *mut qjs::JSPropertyDescriptor,
    obj: JSValue,
    atom: JSAtom,
) -> c_int {
    let (Some(rt), Some(proxy)) = (QuickJsRuntime::from_context(ctx), object_proxy(obj)) else {
        return 0;
    };
    let host = proxy.host.clone();
    let atoms = host_name_atoms(ctx, rt, &host);
    let found = atoms.contains(&atom);
    for a in atoms {
        qjs::JS_FreeAtom(ctx, a);
    }
    if !found {
        return 0;
    }
    if !desc.is_null() {
        let value = object_get_property(ctx, obj, atom, obj);
        if sys::is_exception(value) {
            return -1;
        }
        (*desc).flags = sys::PROP_DATA;
        (*desc).value = value;
        (*desc).getter = sys::undefined();
        (*desc).setter = sys::undefined();
    }
    1
}

unsafe extern "C" fn function_call(
    ctx: *mut JSContext,
    func_obj: JSValue,
    this_val: JSValue,
    argc: c_int,
    argv: *mut JSValue,
    _flags: c_int,
) -> JSValue {
    let (Some(rt), Some(proxy)) = (QuickJsRuntime::from_context(ctx), function_proxy(func_obj))
    else {
        return sys::undefined();
    };
    let func = proxy.func.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let this = to_host_value(ctx, this_val);
        let args = host_args(ctx, argc, argv as *const JSValue);
        func(rt, &this, args.as_slice())
    }));
    finish_value(ctx, "host function call", outcome)
}

unsafe extern "C" fn object_finalize(_rt: *mut JSRuntime, val: JSValue) {
    let slot = slot_for(val, &OBJECT_CLASS_ID);
    if slot.is_null() || (*slot).host_data.is_null() {
        return;
    }
    let mut proxy = Box::from_raw((*slot).host_data as *mut HostObjectProxy);
    let owners = Rc::strong_count(&proxy.host);
    if owners != 1 {
        warn!(
            "host object finalized while {} other references remain",
            owners - 1
        );
    }
    debug_assert_eq!(owners, 1, "engine object must hold the last host object reference");
    proxy.slot.native_state = None;
    proxy.slot.host_data = ptr::null_mut();
}

unsafe extern "C" fn function_finalize(_rt: *mut JSRuntime, val: JSValue) {
    let slot = slot_for(val, &FUNCTION_CLASS_ID);
    if slot.is_null() || (*slot).host_data.is_null() {
        return;
    }
    let mut proxy = Box::from_raw((*slot).host_data as *mut HostFunctionProxy);
    proxy.slot.native_state = None;
    proxy.slot.host_data = ptr::null_mut();
}
