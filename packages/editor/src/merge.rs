//! Recursive structural merge for partial field updates.

use serde_json::{Map, Value};

/// Merge `patch` into `target`.
///
/// Objects merge key-by-key, recursing into nested objects. Arrays,
/// primitives and `null` replace the target value wholesale.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value)
                    }
                    _ => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, patch) => *target = patch.clone(),
    }
}

/// After merging `patch`, turn each `null` it set back into the matching
/// entry of `defaults`, or drop the key when there is none.
pub fn reset_nulls(target: &mut Value, patch: &Value, defaults: &Map<String, Value>) {
    let (Value::Object(target), Value::Object(patch)) = (target, patch) else {
        return;
    };

    for (key, value) in patch {
        let default = defaults.get(key);
        match value {
            Value::Null => match default {
                Some(default) if !default.is_null() => {
                    target.insert(key.clone(), default.clone());
                }
                _ => {
                    target.remove(key);
                }
            },
            Value::Object(_) => {
                let nested = match default {
                    Some(Value::Object(nested)) => nested.clone(),
                    _ => Map::new(),
                };
                if let Some(existing) = target.get_mut(key) {
                    reset_nulls(existing, value, &nested);
                }
            }
            _ => {}
        }
    }
}
