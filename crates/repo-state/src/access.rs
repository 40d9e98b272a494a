//! Deep copy and path traversal over state trees.
//!
//! Traversal follows own keys only: an object segment must be a key of that
//! object, and an array segment must be a canonical decimal index within
//! bounds. Scalars have no children.

use crate::{Path, StoreError, StoreResult};
use serde_json::Value;

/// Structurally independent copy of `value`.
///
/// The result shares nothing with the input; mutating one never affects the
/// other.
#[inline]
pub fn deep_clone(value: &Value) -> Value {
    value.clone()
}

/// Deep copy of the node at `path`.
///
/// Returns [`StoreError::InvalidPathAccess`] when any segment is missing.
///
/// # Examples
///
/// ```
/// use repo_state::{deep_clone_at, Path};
/// use serde_json::json;
///
/// let doc = json!({"root": {"trunk": {"branch": ["leaf"]}}});
/// let trunk = deep_clone_at(&doc, &Path::parse("root.trunk")).unwrap();
/// assert_eq!(trunk, json!({"branch": ["leaf"]}));
///
/// assert!(deep_clone_at(&doc, &Path::parse("root.nonExistent")).is_err());
/// ```
pub fn deep_clone_at(value: &Value, path: &Path) -> StoreResult<Value> {
    get_at_path(value, path)
        .map(deep_clone)
        .ok_or_else(|| StoreError::invalid_path_access(path.clone()))
}

/// Resolve one segment against a node.
fn child<'a>(node: &'a Value, seg: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(seg),
        Value::Array(items) => array_index(seg).and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, seg: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(seg),
        Value::Array(items) => array_index(seg).and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// `"3"` is an index, `"03"` and `"+3"` are not.
fn array_index(seg: &str) -> Option<usize> {
    let idx: usize = seg.parse().ok()?;
    (idx.to_string() == seg).then_some(idx)
}

/// Get a reference to the node at `path`, or `None` if any segment is missing.
pub fn get_at_path<'a>(doc: &'a Value, path: &Path) -> Option<&'a Value> {
    let mut current = doc;
    for seg in path.iter() {
        current = child(current, seg)?;
    }
    Some(current)
}

/// Get a mutable reference to the node at `path`.
pub fn get_at_path_mut<'a>(doc: &'a mut Value, path: &Path) -> Option<&'a mut Value> {
    let mut current = doc;
    for seg in path.iter() {
        current = child_mut(current, seg)?;
    }
    Some(current)
}

/// Check whether every segment of `path` exists as an own key chain.
///
/// The root always exists.
#[inline]
pub fn path_exists(doc: &Value, path: &Path) -> bool {
    get_at_path(doc, path).is_some()
}

/// Replace the node at an existing `path` with `value` (mutating).
///
/// The root path replaces the whole document.
pub fn replace_at_path(doc: &mut Value, path: &Path, value: Value) -> StoreResult<()> {
    let target = get_at_path_mut(doc, path)
        .ok_or_else(|| StoreError::invalid_path_access(path.clone()))?;
    *target = value;
    Ok(())
}

/// Copy of `doc` with the node at `path` replaced by `value` (pure).
///
/// Every ancestor of the target is a fresh copy; `doc` is left untouched.
pub fn with_replaced(doc: &Value, path: &Path, value: Value) -> StoreResult<Value> {
    if path.is_root() {
        return Ok(value);
    }
    let mut updated = deep_clone(doc);
    replace_at_path(&mut updated, path, value)?;
    Ok(updated)
}
