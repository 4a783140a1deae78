//! # Key Utility
//!
//! Deterministic serialisation of parameter objects into cache keys.
//!
//! - Object keys are sorted recursively, so key order never matters
//! - Arrays keep their order (`[1, 2]` and `[2, 1]` are different keys)
//! - `null` fields are kept, absent fields are omitted; the two are distinct
//! - Scalars use canonical JSON, so `1` and `"1"` never collide

use crate::Params;
use serde_json::{Map, Value};

/// Serialise a parameter object into its cache key.
#[must_use]
pub fn stringify_params(params: &Params) -> String {
    let mut out = String::new();
    write_object(params, &mut out);
    out
}

/// Serialise any JSON value with sorted object keys.
#[must_use]
pub fn stringify_value(value: &Value) -> String {
    let mut out = String::new();
    write_value(value, &mut out);
    out
}

/// Serialise a call-site argument list.
#[must_use]
pub fn stringify_args(args: &[Value]) -> String {
    let mut out = String::new();
    write_array(args, &mut out);
    out
}

fn write_value(value: &Value, out: &mut String) {
    match value {
        Value::Array(items) => write_array(items, out),
        Value::Object(map) => write_object(map, out),
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn write_array(items: &[Value], out: &mut String) {
    out.push('[');
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_value(item, out);
    }
    out.push(']');
}

fn write_object(map: &Map<String, Value>, out: &mut String) {
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        // Keys go through the JSON string encoder for escaping.
        out.push_str(&Value::String(key.clone()).to_string());
        out.push(':');
        write_value(value, out);
    }
    out.push('}');
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: Value) -> Params {
        match value {
            Value::Object(map) => map,
            _ => Params::new(),
        }
    }

    #[test]
    fn empty_params() {
        assert_eq!(stringify_params(&Params::new()), "{}");
    }

    #[test]
    fn key_order_is_irrelevant() {
        let a = params(json!({ "slug": "home", "dateRange": "last-28-days", "limit": 10 }));
        let b = params(json!({ "limit": 10, "slug": "home", "dateRange": "last-28-days" }));
        assert_eq!(stringify_params(&a), stringify_params(&b));
        assert_eq!(
            stringify_params(&a),
            r#"{"dateRange":"last-28-days","limit":10,"slug":"home"}"#
        );
    }

    #[test]
    fn nested_objects_are_sorted() {
        let a = params(json!({ "outer": { "b": 1, "a": { "d": 2, "c": 3 } } }));
        assert_eq!(stringify_params(&a), r#"{"outer":{"a":{"c":3,"d":2},"b":1}}"#);
    }

    #[test]
    fn arrays_keep_order() {
        let a = params(json!({ "metrics": ["sessions", "users"] }));
        let b = params(json!({ "metrics": ["users", "sessions"] }));
        assert_ne!(stringify_params(&a), stringify_params(&b));
    }

    #[test]
    fn null_and_absent_are_distinct() {
        let with_null = params(json!({ "a": 1, "b": null }));
        let without = params(json!({ "a": 1 }));
        assert_ne!(stringify_params(&with_null), stringify_params(&without));
    }

    #[test]
    fn scalar_types_do_not_collide() {
        let number = params(json!({ "id": 1 }));
        let string = params(json!({ "id": "1" }));
        let boolean = params(json!({ "id": true }));
        assert_ne!(stringify_params(&number), stringify_params(&string));
        assert_ne!(stringify_params(&string), stringify_params(&boolean));
    }

    #[test]
    fn keys_are_escaped() {
        let a = params(json!({ "a\"b": 1 }));
        assert_eq!(stringify_params(&a), r#"{"a\"b":1}"#);
    }

    #[test]
    fn args_are_keyed_as_array() {
        assert_eq!(stringify_args(&[]), "[]");
        assert_eq!(
            stringify_args(&[json!("a"), json!({ "y": 1, "x": 2 })]),
            r#"["a",{"x":2,"y":1}]"#
        );
        assert_eq!(stringify_value(&json!(null)), "null");
    }
}
