//! Conflict-checked deep merge used when adding state to an existing tree.

use crate::{Path, StoreError, StoreResult};
use serde_json::{Map, Value};

/// Merge `source` into a copy of `target` (pure).
///
/// Objects present on both sides are merged key by key. Any other key that
/// `target` already owns is a conflict, reported with the full dotted path of
/// the collision. Arrays are never merged element-wise.
///
/// # Examples
///
/// ```
/// use repo_state::deep_merge;
/// use serde_json::json;
///
/// let existing = json!({"user": {"name": "John"}});
///
/// let merged = deep_merge(&existing, &json!({"user": {"age": 30}})).unwrap();
/// assert_eq!(merged, json!({"user": {"name": "John", "age": 30}}));
///
/// let err = deep_merge(&existing, &json!({"user": {"name": "Jane"}})).unwrap_err();
/// assert_eq!(err.to_string(), "state conflict detected at path: user.name");
/// ```
pub fn deep_merge(target: &Value, source: &Value) -> StoreResult<Value> {
    let Value::Object(source_map) = source else {
        return Err(StoreError::invalid_argument(source));
    };
    let Value::Object(target_map) = target else {
        return Err(StoreError::state_conflict(Path::root()));
    };
    let mut merged = target_map.clone();
    merge_into(&mut merged, source_map, &mut Path::root())?;
    Ok(Value::Object(merged))
}

fn merge_into(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    at: &mut Path,
) -> StoreResult<()> {
    for (key, source_value) in source {
        at.push(key.as_str());
        match (target.get_mut(key), source_value) {
            (Some(Value::Object(target_child)), Value::Object(source_child)) => {
                merge_into(target_child, source_child, at)?;
            }
            (Some(_), _) => return Err(StoreError::state_conflict(at.clone())),
            (None, _) => {
                target.insert(key.clone(), source_value.clone());
            }
        }
        at.pop();
    }
    Ok(())
}
