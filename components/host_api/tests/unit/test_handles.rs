//! Unit tests for typed handles over a counting PointerValue

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use host_api::{Function, JsString, Object, PointerValue, PropNameId, Symbol, Value};

struct Tracked {
    live: Rc<Cell<i32>>,
    id: u32,
}

impl Tracked {
    fn boxed(live: &Rc<Cell<i32>>, id: u32) -> Box<dyn PointerValue> {
        live.set(live.get() + 1);
        Box::new(Tracked {
            live: live.clone(),
            id,
        })
    }
}

impl PointerValue for Tracked {
    fn clone_pointer(&self) -> Box<dyn PointerValue> {
        Tracked::boxed(&self.live, self.id)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

fn id_of(ptr: &dyn PointerValue) -> u32 {
    ptr.as_any()
        .downcast_ref::<Tracked>()
        .map(|t| t.id)
        .unwrap_or(u32::MAX)
}

#[test]
fn clone_refers_to_same_value() {
    let live = Rc::new(Cell::new(0));
    let s = JsString::from_pointer(Tracked::boxed(&live, 9));
    let copy = s.clone();
    assert_eq!(id_of(copy.pointer()), 9);
    assert_eq!(live.get(), 2);
}

#[test]
fn n_clones_then_release_all_restores_baseline() {
    let live = Rc::new(Cell::new(0));
    let sym = Symbol::from_pointer(Tracked::boxed(&live, 1));
    let baseline = live.get();

    let clones: Vec<Symbol> = (0..10).map(|_| sym.clone()).collect();
    assert_eq!(live.get(), baseline + 10);

    drop(clones);
    assert_eq!(live.get(), baseline);
    sym.invalidate();
    assert_eq!(live.get(), 0);
}

#[test]
fn object_views_share_the_handle() {
    let live = Rc::new(Cell::new(0));
    let obj = Object::from_pointer(Tracked::boxed(&live, 4));
    let func = Function::from_object_unchecked(obj);
    assert_eq!(id_of(func.as_object().pointer()), 4);

    let value: Value = func.into();
    assert!(value.is_object());
    assert_eq!(live.get(), 1);
    drop(value);
    assert_eq!(live.get(), 0);
}

#[test]
fn prop_name_debug_is_opaque() {
    let live = Rc::new(Cell::new(0));
    let name = PropNameId::from_pointer(Tracked::boxed(&live, 2));
    assert_eq!(format!("{:?}", name), "PropNameId(..)");
}
