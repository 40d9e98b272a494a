//! Read and dispatch accessors over a [`RepoContext`].

use crate::access::get_at_path;
use crate::binding::{ContextDispatch, RepoContext};
use crate::{ActionType, Path, StoreResult};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Select sub-trees of `state`.
///
/// - No paths, or any root path: the whole tree.
/// - One path: the node it resolves to.
/// - Several paths: a new object mirroring the requested paths with only
///   those branches populated.
///
/// Missing nodes are absent, never an error. With several paths, a path
/// already covered by an earlier, shorter one adds nothing; intermediate
/// levels are always built as objects.
///
/// # Examples
///
/// ```
/// use repo_state::{select, Path};
/// use serde_json::json;
///
/// let state = json!({"root": {"trunk": {"branch": "leaf", "twig": 1}, "leaves": [1, 2]}});
/// let picked = select(&state, &[Path::parse("root.trunk.branch"), Path::parse("root.leaves")]);
/// assert_eq!(
///     picked,
///     Some(json!({"root": {"trunk": {"branch": "leaf"}, "leaves": [1, 2]}}))
/// );
/// ```
pub fn select(state: &Value, paths: &[Path]) -> Option<Value> {
    match paths {
        [] => Some(state.clone()),
        [path] => get_at_path(state, path).cloned(),
        _ if paths.iter().any(Path::is_root) => Some(state.clone()),
        _ => {
            let mut out = Map::new();
            let mut selected: Vec<&Path> = Vec::with_capacity(paths.len());
            for path in paths {
                if selected.iter().any(|earlier| path.starts_with(earlier)) {
                    continue;
                }
                if let Some(value) = get_at_path(state, path) {
                    graft(&mut out, path.segments(), value.clone());
                    selected.push(path);
                }
            }
            Some(Value::Object(out))
        }
    }
}

fn graft(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut node = target;
    for seg in parents {
        let child = node
            .entry(seg.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        match child {
            Value::Object(map) => node = map,
            // Only reachable through a selected ancestor, which is skipped.
            _ => return,
        }
    }
    node.insert(last.clone(), value);
}

/// Read one or more sub-trees from a context.
pub fn read_state(ctx: &RepoContext, paths: &[Path]) -> Option<Value> {
    select(&ctx.state, paths)
}

/// Read the sub-tree at `path` as a typed value.
///
/// A missing node deserializes from `null`, so `Option<T>` reads it as
/// `None`.
pub fn read_as<T: DeserializeOwned>(ctx: &RepoContext, path: impl Into<Path>) -> StoreResult<T> {
    let path = path.into();
    let value = get_at_path(&ctx.state, &path).cloned().unwrap_or(Value::Null);
    Ok(serde_json::from_value(value)?)
}

/// Dispatcher bound to one path.
#[derive(Clone, Debug)]
pub struct BoundDispatch {
    path: Path,
    dispatch: ContextDispatch,
}

impl BoundDispatch {
    /// The bound path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue `{path, type, value}` on the binding. Returns false if the
    /// provider is gone.
    pub fn dispatch(&self, action_type: impl Into<ActionType>, value: Value) -> bool {
        self.dispatch
            .dispatch(self.path.clone(), action_type, value)
    }
}

/// Bind a dispatcher to `path`.
pub fn bind_dispatch(ctx: &RepoContext, path: impl Into<Path>) -> BoundDispatch {
    BoundDispatch {
        path: path.into(),
        dispatch: ctx.dispatch.clone(),
    }
}

/// The sub-tree at `path` together with a dispatcher bound to it.
pub fn use_repo_state(ctx: &RepoContext, path: impl Into<Path>) -> (Option<Value>, BoundDispatch) {
    let bound = bind_dispatch(ctx, path);
    let value = get_at_path(&ctx.state, &bound.path).cloned();
    (value, bound)
}

/// An unbound dispatcher accepting any `(path, type, value)`.
pub fn use_repo_dispatch(ctx: &RepoContext) -> ContextDispatch {
    ctx.dispatch.clone()
}

impl RepoContext {
    /// See [`read_state`].
    pub fn read(&self, paths: &[Path]) -> Option<Value> {
        read_state(self, paths)
    }

    /// See [`use_repo_state`].
    pub fn use_state(&self, path: impl Into<Path>) -> (Option<Value>, BoundDispatch) {
        use_repo_state(self, path)
    }
}
