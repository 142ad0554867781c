//! Unit tests for Value

use host_api::{Value, ValueKind};

#[test]
fn number_from_integer_is_double() {
    let v = Value::from(-7);
    assert_eq!(v.kind(), ValueKind::Number);
    assert_eq!(v.as_number(), Some(-7.0));
}

#[test]
fn accessors_reject_other_kinds() {
    let v = Value::from(true);
    assert_eq!(v.as_number(), None);
    assert!(v.as_string().is_none());
    assert!(v.as_object().is_none());
    assert!(v.as_symbol().is_none());
    assert!(v.as_bigint().is_none());
}

#[test]
fn predicates_match_exactly_one_kind() {
    let values = [
        Value::undefined(),
        Value::null(),
        Value::from(false),
        Value::from(0.5),
    ];
    for v in &values {
        let hits = [
            v.is_undefined(),
            v.is_null(),
            v.is_bool(),
            v.is_number(),
            v.is_string(),
            v.is_object(),
            v.is_symbol(),
            v.is_bigint(),
        ]
        .iter()
        .filter(|b| **b)
        .count();
        assert_eq!(hits, 1, "{:?}", v);
    }
}

#[test]
fn nan_keeps_its_kind() {
    let v = Value::from(f64::NAN);
    assert!(v.as_number().map(f64::is_nan).unwrap_or(false));
}

#[test]
fn into_object_of_primitive_is_none() {
    assert!(Value::from(1).into_object().is_none());
}
