// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Typed Value Decoder
//!
//! Converts wire-format tagged values into native JSON values. Every
//! Firestore field arrives as a one-key object whose key identifies the
//! type:
//!
//! ```json
//! {"stringValue": "NYC"}
//! {"integerValue": "29"}
//! {"arrayValue": {"values": [{"stringValue": "a"}]}}
//! {"mapValue": {"fields": {"city": {"stringValue": "NYC"}}}}
//! ```
//!
//! Dispatch is tag-by-tag, first match wins. Unrecognized tags decode to
//! null silently; that leniency is load-bearing for compatibility with
//! documents written by newer schema versions and is covered by tests,
//! not treated as an error.

use serde_json::{Map, Number, Value};

/// Wire tag constants, checked in dispatch order.
const TAG_STRING: &str = "stringValue";
const TAG_INTEGER: &str = "integerValue";
const TAG_DOUBLE: &str = "doubleValue";
const TAG_BOOLEAN: &str = "booleanValue";
const TAG_ARRAY: &str = "arrayValue";
const TAG_MAP: &str = "mapValue";
const TAG_TIMESTAMP: &str = "timestampValue";

/// Decode one tagged wire value into a native value.
///
/// Pure function, no I/O, never fails: anything that does not match a
/// recognized tag (including `nullValue` and malformed payloads) decodes
/// to `Value::Null`.
pub fn decode_value(wire: &Value) -> Value {
    let obj = match wire.as_object() {
        Some(o) => o,
        None => return Value::Null,
    };

    if let Some(s) = obj.get(TAG_STRING) {
        return match s.as_str() {
            Some(s) => Value::String(s.to_string()),
            None => Value::Null,
        };
    }
    if let Some(i) = obj.get(TAG_INTEGER) {
        return decode_integer(i);
    }
    if let Some(d) = obj.get(TAG_DOUBLE) {
        return decode_double(d);
    }
    if let Some(b) = obj.get(TAG_BOOLEAN) {
        return match b.as_bool() {
            Some(b) => Value::Bool(b),
            None => Value::Null,
        };
    }
    if let Some(arr) = obj.get(TAG_ARRAY) {
        return decode_array(arr);
    }
    if let Some(map) = obj.get(TAG_MAP) {
        return decode_map(map);
    }
    if let Some(ts) = obj.get(TAG_TIMESTAMP) {
        // Raw timestamp string, no parsing or normalization
        return match ts.as_str() {
            Some(s) => Value::String(s.to_string()),
            None => Value::Null,
        };
    }

    // nullValue, or no recognized tag at all
    Value::Null
}

/// The wire encodes 64-bit integers as JSON strings; older writers used
/// plain numbers. Both forms are accepted, anything else decodes to null.
fn decode_integer(raw: &Value) -> Value {
    match raw {
        Value::String(s) => match s.parse::<i64>() {
            Ok(i) => Value::Number(Number::from(i)),
            Err(_) => Value::Null,
        },
        Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Number(Number::from(i)),
            None => Value::Null,
        },
        _ => Value::Null,
    }
}

fn decode_double(raw: &Value) -> Value {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    };
    match parsed.and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

/// `arrayValue` wraps its elements in `{"values": [...]}`; a missing
/// `values` key means an empty array on the wire.
fn decode_array(raw: &Value) -> Value {
    let values = match raw.get("values").and_then(Value::as_array) {
        Some(v) => v,
        None => return Value::Array(Vec::new()),
    };
    Value::Array(values.iter().map(decode_value).collect())
}

/// `mapValue` wraps its entries in `{"fields": {...}}`. Insertion order
/// is preserved (serde_json is built with `preserve_order`).
fn decode_map(raw: &Value) -> Value {
    let fields = match raw.get("fields").and_then(Value::as_object) {
        Some(f) => f,
        None => return Value::Object(Map::new()),
    };
    let mut out = Map::with_capacity(fields.len());
    for (name, value) in fields {
        out.insert(name.clone(), decode_value(value));
    }
    Value::Object(out)
}
