//! Unit tests for host objects seen from scripts

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use host_api::{
    HostObject, JsError, JsiError, Object, PropNameId, Result, Runtime, Value,
};

use crate::{eval, eval_string, runtime};

struct Record {
    names: Vec<&'static str>,
    fields: RefCell<HashMap<String, f64>>,
}

impl Record {
    fn new(fields: &[(&'static str, f64)]) -> Rc<Self> {
        Rc::new(Self {
            names: fields.iter().map(|(name, _)| *name).collect(),
            fields: RefCell::new(
                fields
                    .iter()
                    .map(|(name, value)| (name.to_string(), *value))
                    .collect(),
            ),
        })
    }
}

impl HostObject for Record {
    fn get(&self, rt: &dyn Runtime, name: &PropNameId) -> Result<Value> {
        let key = name.utf8(rt)?;
        Ok(self
            .fields
            .borrow()
            .get(&key)
            .map(|v| Value::from(*v))
            .unwrap_or_default())
    }

    fn set(&self, rt: &dyn Runtime, name: &PropNameId, value: &Value) -> Result<()> {
        let key = name.utf8(rt)?;
        let number = value.as_number().unwrap_or(f64::NAN);
        self.fields.borrow_mut().insert(key, number);
        Ok(())
    }

    fn get_property_names(&self, rt: &dyn Runtime) -> Vec<PropNameId> {
        self.names
            .iter()
            .map(|name| PropNameId::for_utf8(rt, name))
            .collect()
    }
}

struct Faulty;

impl HostObject for Faulty {
    fn get(&self, rt: &dyn Runtime, name: &PropNameId) -> Result<Value> {
        match name.utf8(rt)?.as_str() {
            "typed" => {
                let payload = Value::String(rt.create_string_from_utf8(b"boom"));
                Err(JsError::new(payload, "boom").into())
            }
            "untyped" => Err(JsiError::host("backing store unavailable")),
            "panics" => panic!("getter panicked"),
            _ => Ok(Value::Undefined),
        }
    }

    fn set(&self, rt: &dyn Runtime, name: &PropNameId, _value: &Value) -> Result<()> {
        match name.utf8(rt)?.as_str() {
            "readonly" => Err(JsError::new(Value::from(7), "7").into()),
            _ => Err(JsiError::host("ignored")),
        }
    }
}

fn install(rt: &dyn Runtime, name: &str, host: Rc<dyn HostObject>) -> Object {
    let obj = Object::from_host_object(rt, host).unwrap();
    rt.global().set_property(rt, name, obj.clone()).unwrap();
    obj
}

#[test]
fn script_reads_host_fields() {
    let rt = runtime();
    let _obj = install(rt.as_runtime(), "rec", Record::new(&[("x", 3.0), ("y", 4.0)]));
    assert_eq!(eval(&rt, "rec.x * rec.y").unwrap().as_number(), Some(12.0));
    assert!(eval(&rt, "rec.missing").unwrap().is_undefined());
}

#[test]
fn script_writes_reach_host() {
    let rt = runtime();
    let record = Record::new(&[("x", 1.0)]);
    let _obj = install(rt.as_runtime(), "rec", record.clone());
    eval(&rt, "rec.x = 41; rec.x += 1;").unwrap();
    assert_eq!(record.fields.borrow().get("x"), Some(&42.0));
}

#[test]
fn enumeration_follows_host_order() {
    let rt = runtime();
    let obj = install(rt.as_runtime(), "rec", Record::new(&[("b", 1.0), ("a", 2.0)]));
    assert_eq!(eval_string(&rt, "Object.keys(rec).join(',')"), "b,a");

    let names = rt.get_property_names(&obj).unwrap();
    assert_eq!(names.size(rt.as_runtime()).unwrap(), 2);
    let first = names.get_value_at_index(rt.as_runtime(), 0).unwrap();
    assert_eq!(first.as_utf8(rt.as_runtime()).unwrap().as_deref(), Some("b"));
}

#[test]
fn host_names_are_own_properties() {
    let rt = runtime();
    let _obj = install(rt.as_runtime(), "rec", Record::new(&[("k", 1.0)]));
    assert_eq!(eval(&rt, "Object.prototype.hasOwnProperty.call(rec, 'k')").unwrap().as_bool(), Some(true));
    assert_eq!(eval(&rt, "'k' in rec").unwrap().as_bool(), Some(true));
    assert_eq!(eval(&rt, "'zzz' in rec").unwrap().as_bool(), Some(false));
    assert_eq!(eval_string(&rt, "JSON.stringify(rec)"), "{\"k\":1}");
}

#[test]
fn typed_error_is_thrown_into_script() {
    let rt = runtime();
    let _obj = install(rt.as_runtime(), "faulty", Rc::new(Faulty));
    let err = eval(&rt, "faulty.typed").unwrap_err();
    let js = err.as_js_error().expect("script error");
    assert_eq!(js.value().as_utf8(rt.as_runtime()).unwrap().as_deref(), Some("boom"));

    assert_eq!(
        eval_string(&rt, "try { faulty.typed; 'no' } catch (e) { e }"),
        "boom"
    );
}

#[test]
fn untyped_error_reads_as_undefined() {
    let rt = runtime();
    let _obj = install(rt.as_runtime(), "faulty", Rc::new(Faulty));
    assert!(eval(&rt, "faulty.untyped").unwrap().is_undefined());
}

#[test]
fn panicking_getter_reads_as_undefined() {
    let rt = runtime();
    let _obj = install(rt.as_runtime(), "faulty", Rc::new(Faulty));
    assert!(eval(&rt, "faulty.panics").unwrap().is_undefined());
}

#[test]
fn setter_errors_follow_the_same_policy() {
    let rt = runtime();
    let _obj = install(rt.as_runtime(), "faulty", Rc::new(Faulty));
    assert_eq!(
        eval(&rt, "try { faulty.readonly = 1; 0 } catch (e) { e }").unwrap().as_number(),
        Some(7.0)
    );
    assert_eq!(eval(&rt, "faulty.other = 1").unwrap().as_number(), Some(1.0));
}

#[test]
fn host_object_identity_round_trips() {
    let rt = runtime();
    let host: Rc<dyn HostObject> = Record::new(&[]);
    let obj = Object::from_host_object(rt.as_runtime(), host.clone()).unwrap();
    assert!(obj.is_host_object(rt.as_runtime()));
    let back = obj.get_host_object(rt.as_runtime()).unwrap();
    assert!(Rc::ptr_eq(&host, &back));
    // The engine object must hold the last reference when it is finalized.
    drop(back);
    drop(host);
    drop(obj);
}

#[test]
fn plain_objects_are_not_host_objects() {
    let rt = runtime();
    let obj = rt.create_object();
    assert!(!obj.is_host_object(rt.as_runtime()));
    assert!(obj.get_host_object(rt.as_runtime()).is_none());
}

#[test]
fn host_object_released_after_collection() {
    let rt = runtime();
    let record = Record::new(&[]);
    let watch = Rc::downgrade(&record);
    let obj = Object::from_host_object(rt.as_runtime(), record).unwrap();
    assert!(watch.upgrade().is_some());
    drop(obj);
    rt.instrumentation().collect_garbage("test");
    assert!(watch.upgrade().is_none());
}

#[test]
fn native_state_on_host_object() {
    let rt = runtime();
    let obj = Object::from_host_object(rt.as_runtime(), Record::new(&[])).unwrap();
    assert!(!rt.has_native_state(&obj));

    rt.set_native_state(&obj, Rc::new(99u32)).unwrap();
    assert!(rt.has_native_state(&obj));
    let state = rt.get_native_state(&obj).unwrap();
    assert_eq!(state.downcast_ref::<u32>(), Some(&99));

    rt.set_native_state(&obj, Rc::new("replaced")).unwrap();
    let state = rt.get_native_state(&obj).unwrap();
    assert_eq!(state.downcast_ref::<&str>(), Some(&"replaced"));
}

#[test]
fn native_state_on_plain_object_is_unsupported() {
    let rt = runtime();
    let obj = rt.create_object();
    assert!(!rt.has_native_state(&obj));
    assert!(rt.get_native_state(&obj).is_none());
    assert!(matches!(
        rt.set_native_state(&obj, Rc::new(1u8)),
        Err(JsiError::NotImplemented(_))
    ));
}
