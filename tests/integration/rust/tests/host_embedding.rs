//! Host objects and host functions working together
//!
//! Models a small key-value store owned by the host and exposed to scripts
//! as both an object with dynamic properties and a set of functions.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use host_api::{
    Function, HostFunction, HostObject, JsError, Object, PropNameId, Result, Runtime, Value,
};
use integration_tests::{run, run_to_string, uncached_runtime};

type Entries = Rc<RefCell<BTreeMap<String, String>>>;

/// Exposes shared entries to scripts. The engine object owns the store itself.
struct Store {
    entries: Entries,
}

impl HostObject for Store {
    fn get(&self, rt: &dyn Runtime, name: &PropNameId) -> Result<Value> {
        let key = name.utf8(rt)?;
        Ok(match self.entries.borrow().get(&key) {
            Some(v) => Value::from(rt.create_string_from_utf8(v.as_bytes())),
            None => Value::Undefined,
        })
    }

    fn set(&self, rt: &dyn Runtime, name: &PropNameId, value: &Value) -> Result<()> {
        let key = name.utf8(rt)?;
        let Some(text) = value.as_utf8(rt)? else {
            return Err(JsError::from_message(rt, &format!("{} must be a string", key)).into());
        };
        self.entries.borrow_mut().insert(key, text);
        Ok(())
    }

    fn get_property_names(&self, rt: &dyn Runtime) -> Vec<PropNameId> {
        self.entries
            .borrow()
            .keys()
            .map(|k| PropNameId::for_utf8(rt, k))
            .collect()
    }
}

fn install_store(rt: &dyn Runtime, entries: Entries) -> Object {
    let store = Rc::new(Store { entries: entries.clone() });
    let obj = rt.create_object_with_host_object(store).unwrap();
    rt.global().set_property(rt, "store", obj.clone()).unwrap();

    let count: HostFunction = Rc::new(move |_rt: &dyn Runtime, _this: &Value, _args: &[Value]| {
        Ok(Value::from(entries.borrow().len() as f64))
    });
    let count = Function::from_host_function(rt, "count", 0, count).unwrap();
    rt.global().set_property(rt, "count", count).unwrap();
    obj
}

#[test]
fn test_script_fills_host_store() {
    let rt = uncached_runtime();
    let entries = Entries::default();
    let _obj = install_store(rt.as_runtime(), entries.clone());

    run(rt.as_runtime(), "store.alpha = 'a'; store.beta = 'b';", "fill.js").unwrap();
    assert_eq!(entries.borrow().get("alpha").map(String::as_str), Some("a"));
    assert_eq!(run(rt.as_runtime(), "count()", "count.js").unwrap().as_number(), Some(2.0));
}

#[test]
fn test_script_enumerates_host_store() {
    let rt = uncached_runtime();
    let entries = Entries::default();
    entries.borrow_mut().insert("x".into(), "1".into());
    entries.borrow_mut().insert("y".into(), "2".into());
    let _obj = install_store(rt.as_runtime(), entries);

    assert_eq!(
        run_to_string(rt.as_runtime(), "Object.entries(store).map(([k, v]) => k + '=' + v).join('&')"),
        "x=1&y=2"
    );
}

#[test]
fn test_store_rejects_non_strings_with_catchable_error() {
    let rt = uncached_runtime();
    let entries = Entries::default();
    let _obj = install_store(rt.as_runtime(), entries.clone());

    assert_eq!(
        run_to_string(rt.as_runtime(), "try { store.n = 5; 'stored' } catch (e) { e.message }"),
        "n must be a string"
    );
    assert!(entries.borrow().is_empty());
}

#[test]
fn test_host_reads_through_object_handle() {
    let rt = uncached_runtime();
    let obj = install_store(rt.as_runtime(), Entries::default());
    run(rt.as_runtime(), "store.k = 'v';", "set.js").unwrap();

    let v = obj.get_property(rt.as_runtime(), "k").unwrap();
    assert_eq!(v.as_utf8(rt.as_runtime()).unwrap().as_deref(), Some("v"));
    assert!(obj.is_host_object(rt.as_runtime()));
    assert!(!obj.is_function(rt.as_runtime()));
}

#[test]
fn test_native_state_survives_script_round_trip() {
    let rt = uncached_runtime();
    let obj = install_store(rt.as_runtime(), Entries::default());
    rt.set_native_state(&obj, Rc::new(String::from("tagged"))).unwrap();

    let back = run(rt.as_runtime(), "store", "back.js")
        .unwrap()
        .into_object()
        .unwrap();
    let state = rt.get_native_state(&back).unwrap();
    assert_eq!(state.downcast_ref::<String>().map(String::as_str), Some("tagged"));
}

#[test]
fn test_heap_info_and_gc_through_trait() {
    let rt = uncached_runtime();
    let runtime: &dyn Runtime = rt.as_runtime();
    runtime.instrumentation().collect_garbage("integration");
    let stats: serde_json::Value =
        serde_json::from_str(&runtime.instrumentation().get_recorded_gc_stats()).unwrap();
    assert_eq!(stats["last_cause"], "integration");
    assert!(runtime.instrumentation().get_heap_info(false)["memory_used_size"] > 0);
}
