use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use host_api::{
    HostObject, JsError, JsiError, Object, PropNameId, Result, Runtime, StringBuffer, Value,
};
use quickjs_runtime::{handle_ref_count, CodeCache, QuickJsRuntime, RuntimeConfig};

fn runtime() -> Pin<Box<QuickJsRuntime>> {
    QuickJsRuntime::new(RuntimeConfig::default().without_code_cache()).unwrap()
}

fn eval(rt: &QuickJsRuntime, source: &str, url: &str) -> Result<Value> {
    rt.evaluate_javascript(Arc::new(StringBuffer::new(source)), url)
}

mod conversion_contract_tests {
    use super::*;

    fn round_trip(rt: &QuickJsRuntime, value: Value) -> Value {
        let holder = rt.create_object();
        holder.set_property(rt.as_runtime(), "v", value).unwrap();
        holder.get_property(rt.as_runtime(), "v").unwrap()
    }

    #[test]
    fn test_primitives_round_trip() {
        let rt = runtime();
        assert!(round_trip(&rt, Value::Undefined).is_undefined());
        assert!(round_trip(&rt, Value::Null).is_null());
        assert_eq!(round_trip(&rt, Value::from(true)).as_bool(), Some(true));
        assert_eq!(round_trip(&rt, Value::from(false)).as_bool(), Some(false));
        for n in [0.0, -0.5, 42.0, 1e300, f64::INFINITY] {
            assert_eq!(round_trip(&rt, Value::from(n)).as_number(), Some(n));
        }
        assert!(round_trip(&rt, Value::from(f64::NAN)).as_number().unwrap().is_nan());
    }

    #[test]
    fn test_strings_round_trip() {
        let rt = runtime();
        for text in ["", "ascii", "ünïcødé", "emoji 🎉"] {
            let s = Value::from(rt.create_string_from_utf8(text.as_bytes()));
            let back = round_trip(&rt, s);
            assert_eq!(back.as_utf8(rt.as_runtime()).unwrap().as_deref(), Some(text));
        }
    }

    #[test]
    fn test_script_kinds_map_to_value_kinds() {
        let rt = runtime();
        assert!(eval(&rt, "undefined", "k.js").unwrap().is_undefined());
        assert!(eval(&rt, "null", "k.js").unwrap().is_null());
        assert!(eval(&rt, "true", "k.js").unwrap().is_bool());
        assert!(eval(&rt, "1", "k.js").unwrap().is_number());
        assert!(eval(&rt, "'s'", "k.js").unwrap().is_string());
        assert!(eval(&rt, "({})", "k.js").unwrap().is_object());
        assert!(eval(&rt, "Symbol()", "k.js").unwrap().is_symbol());
        assert!(eval(&rt, "1n", "k.js").unwrap().is_bigint());
    }
}

mod handle_contract_tests {
    use super::*;

    #[test]
    fn test_clones_restore_baseline() {
        let rt = runtime();
        let obj = rt.create_object();
        let baseline = handle_ref_count(obj.pointer()).unwrap();

        let clones: Vec<Object> = (0..4).map(|_| obj.clone()).collect();
        assert_eq!(handle_ref_count(obj.pointer()), Some(baseline + 4));
        drop(clones);
        assert_eq!(handle_ref_count(obj.pointer()), Some(baseline));
    }

    #[test]
    fn test_string_handles_balance() {
        let rt = runtime();
        let s = rt.create_string_from_utf8(b"counted");
        let baseline = handle_ref_count(s.pointer()).unwrap();
        {
            let _a = s.clone();
            let _b = Value::from(s.clone());
            assert_eq!(handle_ref_count(s.pointer()), Some(baseline + 2));
        }
        assert_eq!(handle_ref_count(s.pointer()), Some(baseline));
    }

    #[test]
    fn test_reading_a_property_adds_one_owned_reference() {
        let rt = runtime();
        let obj = rt.create_object();
        let holder = rt.create_object();
        holder.set_property(rt.as_runtime(), "o", obj.clone()).unwrap();
        let baseline = handle_ref_count(obj.pointer()).unwrap();
        let read = holder.get_property(rt.as_runtime(), "o").unwrap();
        assert_eq!(handle_ref_count(obj.pointer()), Some(baseline + 1));
        drop(read);
        assert_eq!(handle_ref_count(obj.pointer()), Some(baseline));
    }
}

struct Pair;

impl HostObject for Pair {
    fn get(&self, rt: &dyn Runtime, name: &PropNameId) -> Result<Value> {
        match name.utf8(rt)?.as_str() {
            "typed" => Err(JsError::new(
                Value::from(rt.create_string_from_utf8(b"boom")),
                "boom",
            )
            .into()),
            "untyped" => Err(JsiError::host("not typed")),
            _ => Ok(Value::Undefined),
        }
    }

    fn get_property_names(&self, rt: &dyn Runtime) -> Vec<PropNameId> {
        vec![PropNameId::for_utf8(rt, "b"), PropNameId::for_utf8(rt, "a")]
    }
}

mod proxy_contract_tests {
    use super::*;

    #[test]
    fn test_host_object_identity() {
        let rt = runtime();
        let host: Rc<dyn HostObject> = Rc::new(Pair);
        let obj = rt.create_object_with_host_object(host.clone()).unwrap();
        assert!(Rc::ptr_eq(&rt.get_host_object(&obj).unwrap(), &host));
        drop(host);
        drop(obj);
    }

    #[test]
    fn test_enumeration_order_is_host_order() {
        let rt = runtime();
        let obj = rt.create_object_with_host_object(Rc::new(Pair)).unwrap();
        rt.global().set_property(rt.as_runtime(), "pair", obj).unwrap();
        let keys = eval(&rt, "Object.keys(pair).join(',')", "order.js").unwrap();
        assert_eq!(keys.as_utf8(rt.as_runtime()).unwrap().as_deref(), Some("b,a"));
    }
}

mod error_contract_tests {
    use super::*;

    fn with_pair(rt: &QuickJsRuntime) {
        let obj = rt.create_object_with_host_object(Rc::new(Pair)).unwrap();
        rt.global().set_property(rt.as_runtime(), "pair", obj).unwrap();
    }

    #[test]
    fn test_typed_error_crosses_boundary() {
        let rt = runtime();
        with_pair(&rt);
        let err = eval(&rt, "pair.typed", "err.js").unwrap_err();
        let value = err.as_js_error().unwrap().value().clone();
        assert_eq!(value.as_utf8(rt.as_runtime()).unwrap().as_deref(), Some("boom"));
    }

    #[test]
    fn test_untyped_error_is_absorbed() {
        let rt = runtime();
        with_pair(&rt);
        assert!(eval(&rt, "pair.untyped", "err.js").unwrap().is_undefined());
    }

    #[test]
    fn test_script_errors_are_typed() {
        let rt = runtime();
        let err = eval(&rt, "null.x", "err.js").unwrap_err();
        assert!(matches!(err, JsiError::Js(_)));
        assert!(err.to_string().starts_with("TypeError"));
    }
}

mod cache_contract_tests {
    use super::*;

    #[test]
    fn test_cache_is_transparent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(CodeCache::new(dir.path()));
        let rt = QuickJsRuntime::with_code_cache(RuntimeConfig::default(), cache.clone()).unwrap();
        assert_eq!(eval(&rt, "1+1", "a.js").unwrap().as_number(), Some(2.0));
        assert_eq!(eval(&rt, "1+1", "a.js").unwrap().as_number(), Some(2.0));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }
}

mod microtask_contract_tests {
    use super::*;

    #[test]
    fn test_dependent_jobs_complete_before_drain_reports_empty() {
        let rt = runtime();
        eval(
            &rt,
            "var done = 0; Promise.resolve().then(() => done++).then(() => done++).then(() => done++);",
            "jobs.js",
        )
        .unwrap();
        assert!(rt.drain_microtasks(-1).unwrap());
        assert_eq!(eval(&rt, "done", "jobs.js").unwrap().as_number(), Some(3.0));
    }
}
