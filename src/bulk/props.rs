//! Property classification and value encoding.

use serde_json::Value;

use crate::primitives::bytes::{cstr, le};

use super::types::{PropValue, PropertyType};

/// Returns the wire type `value` classifies to.
pub fn classify(value: &Value) -> PropertyType {
    classify_value(value).property_type()
}

/// Classifies `value` into an encodable [`PropValue`].
///
/// Strings are sniffed: empty strings become null, `true`/`false` (any ASCII case)
/// become booleans, integer and finite float literals become numbers. Bracketed text
/// such as `"[1,2]"` stays a string; only JSON arrays produce [`PropValue::Array`].
pub fn classify_value(value: &Value) -> PropValue {
    match value {
        Value::Null => PropValue::Null,
        Value::Bool(v) => PropValue::Bool(*v),
        Value::Number(num) => {
            if let Some(i) = num.as_i64() {
                PropValue::Long(i)
            } else {
                PropValue::Double(num.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::String(s) => classify_str(s),
        Value::Array(items) => PropValue::Array(items.iter().map(classify_value).collect()),
        Value::Object(_) => PropValue::Str(value.to_string()),
    }
}

fn classify_str(raw: &str) -> PropValue {
    if raw.is_empty() {
        return PropValue::Null;
    }
    if raw.eq_ignore_ascii_case("true") {
        return PropValue::Bool(true);
    }
    if raw.eq_ignore_ascii_case("false") {
        return PropValue::Bool(false);
    }
    if let Ok(int_val) = raw.parse::<i64>() {
        return PropValue::Long(int_val);
    }
    if let Ok(float_val) = raw.parse::<f64>() {
        if float_val.is_finite() {
            return PropValue::Double(float_val);
        }
    }
    PropValue::Str(raw.to_string())
}

/// Appends the tagged encoding of `value` to `out`.
pub fn encode_value(value: &PropValue, out: &mut Vec<u8>) {
    out.push(value.property_type().tag());
    match value {
        PropValue::Null => {}
        PropValue::Bool(v) => out.push(u8::from(*v)),
        PropValue::Double(v) => le::put_f64(out, *v),
        PropValue::Str(s) => cstr::put(out, s),
        PropValue::Long(v) => le::put_i64(out, *v),
        PropValue::Array(items) => {
            le::put_u64(out, items.len() as u64);
            for item in items {
                encode_value(item, out);
            }
        }
    }
}

/// Number of bytes [`encode_value`] appends for `value`.
pub fn encoded_len(value: &PropValue) -> usize {
    1 + match value {
        PropValue::Null => 0,
        PropValue::Bool(_) => 1,
        PropValue::Double(_) | PropValue::Long(_) => 8,
        PropValue::Str(s) => cstr::encoded_len(s),
        PropValue::Array(items) => 8 + items.iter().map(encoded_len).sum::<usize>(),
    }
}

/// Encodes `value` as a standalone byte vector.
pub fn encode(value: &PropValue) -> Vec<u8> {
    let mut out = Vec::with_capacity(encoded_len(value));
    encode_value(value, &mut out);
    out
}
