use serde_json::{Map, Value};

/// Keys that can remap object-prototype internals in consumers that treat records as
/// plain JavaScript objects downstream.
pub const TAINTED_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Returns a deep copy of `record` with tainted keys removed at every depth, plus the
/// number of keys removed.
pub fn strip_tainted_keys(record: Map<String, Value>) -> (Map<String, Value>, usize) {
    let mut removed = 0usize;
    let cleaned = clean_map(record, &mut removed);
    (cleaned, removed)
}

fn clean_map(map: Map<String, Value>, removed: &mut usize) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        if TAINTED_KEYS.contains(&key.as_str()) {
            *removed += 1;
            continue;
        }
        out.insert(key, clean_value(value, removed));
    }
    out
}

fn clean_value(value: Value, removed: &mut usize) -> Value {
    match value {
        Value::Object(map) => Value::Object(clean_map(map, removed)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| clean_value(item, removed))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_tainted_keys_at_every_depth() {
        let record = json!({
            "type": "noop",
            "__proto__": {"admin": true},
            "nested": {"constructor": {"prototype": 1}, "keep": [{"__proto__": 2, "ok": 3}]},
        });
        let (cleaned, removed) =
            strip_tainted_keys(record.as_object().cloned().expect("object"));
        assert_eq!(removed, 3);
        assert_eq!(
            Value::Object(cleaned),
            json!({"type": "noop", "nested": {"keep": [{"ok": 3}]}})
        );
    }
}
