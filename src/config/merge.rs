//! Layer merge
//!
//! Objects merge by key, everything else is replaced by the later layer.

use serde_json::Value;

/// Merge `overlay` onto `base`.
///
/// - Objects: recursive merge by key
/// - Arrays and scalars: overlay replaces base
/// - Null: overlay replaces base (clears a value)
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge layers in order; the last layer has highest precedence
pub fn merge_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_keys_survive() {
        let base = json!({"retention": {"max_sources": 2, "order_by": "date"}});
        let overlay = json!({"retention": {"max_sources": 5}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["retention"]["max_sources"], 5);
        assert_eq!(merged["retention"]["order_by"], "date");
    }

    #[test]
    fn test_arrays_replace() {
        let base = json!({"upload": {"args": ["-f", "-u"]}});
        let overlay = json!({"upload": {"args": ["-d"]}});
        let merged = deep_merge(base, overlay);
        assert_eq!(merged["upload"]["args"], json!(["-d"]));
    }

    #[test]
    fn test_later_layers_win() {
        let merged = merge_layers(vec![
            json!({"archive": {"timeout_seconds": 30, "consumer": "a"}}),
            json!({"archive": {"timeout_seconds": 60}}),
            json!({"archive": {"consumer": "b"}}),
        ]);
        assert_eq!(merged["archive"]["timeout_seconds"], 60);
        assert_eq!(merged["archive"]["consumer"], "b");
    }

    #[test]
    fn test_empty_layers_is_null() {
        assert!(merge_layers(Vec::new()).is_null());
    }
}
