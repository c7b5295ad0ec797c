//! Firestore typed value codec.
//!
//! Firestore's REST API wraps every value in a one-key object naming its
//! type (`{"stringValue": "x"}`, `{"integerValue": "42"}`). Documents are
//! plain JSON everywhere else in the crate; this module converts at the
//! adapter edge.

use serde_json::{Map, Number, Value, json};

use super::FirebaseError;

/// Wrap a plain JSON value in Firestore's typed representation.
///
/// Integers become `integerValue` (serialized as a string, as the API
/// expects); any other number becomes `doubleValue`.
#[must_use]
pub fn encode(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode every field of a document body.
#[must_use]
pub fn encode_fields(fields: &Map<String, Value>) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(key, value)| (key.clone(), encode(value)))
            .collect(),
    )
}

/// Unwrap a Firestore typed value into plain JSON.
///
/// Timestamps and references decode to strings; geo points decode to
/// `{"latitude", "longitude"}` objects.
///
/// # Errors
///
/// Returns `FirebaseError::Codec` for an unknown type tag or a malformed
/// payload.
pub fn decode(value: &Value) -> Result<Value, FirebaseError> {
    let Some((tag, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Err(FirebaseError::Codec(format!("not a typed value: {value}")));
    };

    match tag.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" | "doubleValue" | "geoPointValue" => Ok(inner.clone()),
        "integerValue" => {
            // Sent as a string on the wire, but accept numbers too.
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                Value::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed
                .map(|i| Value::Number(Number::from(i)))
                .ok_or_else(|| FirebaseError::Codec(format!("bad integerValue: {inner}")))
        }
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => match inner {
            Value::String(_) => Ok(inner.clone()),
            _ => Err(FirebaseError::Codec(format!("bad {tag}: {inner}"))),
        },
        "arrayValue" => {
            let values = inner.get("values").and_then(Value::as_array);
            values
                .map_or_else(|| Ok(Vec::new()), |items| items.iter().map(decode).collect())
                .map(Value::Array)
        }
        "mapValue" => match inner.get("fields") {
            Some(fields) => decode_fields(fields).map(Value::Object),
            None => Ok(Value::Object(Map::new())),
        },
        other => Err(FirebaseError::Codec(format!("unknown value type: {other}"))),
    }
}

/// Decode a document's `fields` object.
///
/// # Errors
///
/// Returns `FirebaseError::Codec` if `fields` is not an object or any value
/// fails to decode.
pub fn decode_fields(fields: &Value) -> Result<Map<String, Value>, FirebaseError> {
    let Some(object) = fields.as_object() else {
        return Err(FirebaseError::Codec(format!("fields is not an object: {fields}")));
    };
    object
        .iter()
        .map(|(key, value)| decode(value).map(|v| (key.clone(), v)))
        .collect()
}
