//! Structural checks on a (migrated) envelope before it is deserialized.
//!
//! Errors name the offending location, e.g.
//! `nodes.a-3.children[2]: expected string`.

use crate::envelope::CURRENT_SCHEMA_VERSION;
use crate::error::{PersistError, PersistResult};
use serde_json::{Map, Value};

/// Check every required key of the envelope and every node entry
pub fn validate_envelope(document: &Map<String, Value>) -> PersistResult<()> {
    match document.get("schemaVersion").and_then(Value::as_u64) {
        Some(CURRENT_SCHEMA_VERSION) => {}
        Some(other) => {
            return Err(PersistError::validation(
                "schemaVersion",
                format!("expected {}, found {}", CURRENT_SCHEMA_VERSION, other),
            ))
        }
        None => return Err(PersistError::validation("schemaVersion", "expected integer")),
    }

    for key in ["builderVersion", "formId", "formName"] {
        require_string(document.get(key), key)?;
    }
    for key in ["createdAt", "updatedAt"] {
        require_number(document.get(key), key)?;
    }

    string_array(document.get("rootIds"), "rootIds")?;

    let nodes = match document.get("nodes") {
        Some(Value::Object(nodes)) => nodes,
        Some(_) => return Err(PersistError::validation("nodes", "expected object")),
        None => return Err(PersistError::validation("nodes", "missing")),
    };

    for (key, node) in nodes {
        validate_node(node, &format!("nodes.{}", key))?;
    }

    Ok(())
}

fn validate_node(node: &Value, path: &str) -> PersistResult<()> {
    let Value::Object(node) = node else {
        return Err(PersistError::validation(path, "expected object"));
    };

    require_string(node.get("id"), &format!("{}.id", path))?;

    match node.get("field") {
        Some(Value::Object(field)) => {
            let type_path = format!("{}.field.type", path);
            match field.get("type") {
                Some(Value::String(t)) if !t.trim().is_empty() => {}
                Some(Value::String(_)) => {
                    return Err(PersistError::validation(type_path, "must not be empty"))
                }
                Some(_) => return Err(PersistError::validation(type_path, "expected string")),
                None => return Err(PersistError::validation(type_path, "missing")),
            }
        }
        Some(_) => return Err(PersistError::validation(format!("{}.field", path), "expected object")),
        None => return Err(PersistError::validation(format!("{}.field", path), "missing")),
    }

    for key in ["parentId", "parentSlot"] {
        match node.get(key) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => {
                return Err(PersistError::validation(
                    format!("{}.{}", path, key),
                    "expected string or null",
                ))
            }
        }
    }

    string_array(node.get("children"), &format!("{}.children", path))?;

    match node.get("tabChildren") {
        None | Some(Value::Null) => {}
        Some(Value::Object(slots)) => {
            for (slot, ids) in slots {
                string_array(Some(ids), &format!("{}.tabChildren.{}", path, slot))?;
            }
        }
        Some(_) => {
            return Err(PersistError::validation(
                format!("{}.tabChildren", path),
                "expected object",
            ))
        }
    }

    Ok(())
}

fn require_string(value: Option<&Value>, path: &str) -> PersistResult<()> {
    match value {
        Some(Value::String(_)) => Ok(()),
        Some(_) => Err(PersistError::validation(path, "expected string")),
        None => Err(PersistError::validation(path, "missing")),
    }
}

fn require_number(value: Option<&Value>, path: &str) -> PersistResult<()> {
    match value {
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
        Some(_) => Err(PersistError::validation(path, "expected epoch milliseconds")),
        None => Err(PersistError::validation(path, "missing")),
    }
}

fn string_array(value: Option<&Value>, path: &str) -> PersistResult<()> {
    let items = match value {
        Some(Value::Array(items)) => items,
        Some(_) => return Err(PersistError::validation(path, "expected array")),
        None => return Err(PersistError::validation(path, "missing")),
    };

    for (index, item) in items.iter().enumerate() {
        if !item.is_string() {
            return Err(PersistError::validation(
                format!("{}[{}]", path, index),
                "expected string",
            ));
        }
    }
    Ok(())
}
