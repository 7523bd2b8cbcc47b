//! Decoder for bracket-nested form bodies (`data[0][name]=Ann`).

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Decodes a form body into a JSON object. Objects whose keys are exactly
/// `0..n` become arrays. Every leaf is a string.
pub fn decode(body: &str) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in form_urlencoded::parse(body.as_bytes()) {
        let path = split_key(&key);
        insert(&mut root, &path, Value::String(value.into_owned()));
    }
    arrayify(root)
}

fn split_key(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    let mut path = vec![key[..open].to_string()];
    path.extend(
        key[open..]
            .split('[')
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_end_matches(']').to_string()),
    );
    path
}

fn insert(node: &mut Value, path: &[String], leaf: Value) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        map.insert(head.clone(), leaf);
    } else {
        let child = map
            .entry(head.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        insert(child, rest, leaf);
    }
}

fn arrayify(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut indexed: Vec<(usize, Value)> = Vec::with_capacity(map.len());
            let mut sequential = !map.is_empty();
            for (k, v) in &map {
                match k.parse::<usize>() {
                    Ok(i) => indexed.push((i, v.clone())),
                    Err(_) => {
                        sequential = false;
                        break;
                    }
                }
            }
            if sequential {
                indexed.sort_by_key(|(i, _)| *i);
                sequential = indexed.iter().enumerate().all(|(pos, (i, _))| pos == *i);
            }
            if sequential {
                Value::Array(indexed.into_iter().map(|(_, v)| arrayify(v)).collect())
            } else {
                Value::Object(map.into_iter().map(|(k, v)| (k, arrayify(v))).collect())
            }
        }
        other => other,
    }
}
