//! Nested form encoding for request bodies and query strings.
//!
//! SheetDB reads its parameters the way PHP does: nested structures are
//! flattened into bracketed keys, so `{"data": [{"name": "Ann"}]}` travels as
//! `data%5B0%5D%5Bname%5D=Ann`. Scalars keep their JSON text form except
//! strings, which are sent unquoted. Nulls and empty containers produce no
//! pair at all.

use serde_json::Value;
use url::form_urlencoded;

/// Encodes `(key, value)` pairs as an `application/x-www-form-urlencoded`
/// string, flattening nested values into bracketed keys.
pub fn encode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    let mut flat = Vec::new();
    for (key, value) in pairs {
        flatten(key.to_string(), value, &mut flat);
    }
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(flat)
        .finish()
}

/// Encodes the single-field `data` body sent with every request.
pub fn encode_data(data: &Value) -> String {
    encode([("data", data)])
}

fn flatten(prefix: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((prefix, b.to_string())),
        Value::Number(n) => out.push((prefix, n.to_string())),
        Value::String(s) => out.push((prefix, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(format!("{prefix}[{i}]"), item, out);
            }
        }
        Value::Object(map) => {
            for (k, item) in map {
                flatten(format!("{prefix}[{k}]"), item, out);
            }
        }
    }
}
