//! Reducers and the `(path, action type)` reducer registry.

use crate::{Path, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a reducer.
#[derive(Debug, Error)]
pub enum ReducerError {
    /// The reducer refused the input.
    #[error("{0}")]
    Rejected(String),

    /// A typed reducer could not convert its input or output.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ReducerError {
    /// Create a rejection with a message.
    pub fn rejected(message: impl Into<String>) -> Self {
        ReducerError::Rejected(message.into())
    }
}

type ReduceFn = dyn Fn(Value, Value) -> Result<Value, ReducerError> + Send + Sync;

/// A pure function `(sub_state, value) -> new_sub_state`.
///
/// Reducers receive an owned copy of the sub-tree at their path and the
/// action value (`Null` when the action carried none). They must not touch
/// anything outside their arguments.
///
/// # Examples
///
/// ```
/// use repo_state::Reducer;
/// use serde_json::{json, Value};
///
/// let increment = Reducer::new(|v: Value, amount: Value| {
///     json!(v.as_i64().unwrap_or(0) + amount.as_i64().unwrap_or(1))
/// });
/// assert_eq!(increment.reduce(json!(5), Value::Null).unwrap(), json!(6));
///
/// let append = Reducer::typed(|mut todos: Vec<String>, todo: String| {
///     todos.push(todo);
///     todos
/// });
/// assert_eq!(append.reduce(json!(["a"]), json!("b")).unwrap(), json!(["a", "b"]));
/// ```
#[derive(Clone)]
pub struct Reducer(Arc<ReduceFn>);

impl Reducer {
    /// Wrap an infallible reducer over raw JSON values.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, Value) -> Value + Send + Sync + 'static,
    {
        Self(Arc::new(move |sub, value| Ok(f(sub, value))))
    }

    /// Wrap a reducer that may reject its input.
    pub fn try_new<F>(f: F) -> Self
    where
        F: Fn(Value, Value) -> Result<Value, ReducerError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Wrap a reducer over serde types.
    ///
    /// The sub-tree is deserialized into `S` and the action value into `V`;
    /// the returned `S` is serialized back. Use `Option<V>` to accept actions
    /// dispatched without a value.
    pub fn typed<S, V, F>(f: F) -> Self
    where
        S: DeserializeOwned + Serialize,
        V: DeserializeOwned,
        F: Fn(S, V) -> S + Send + Sync + 'static,
    {
        Self::try_new(move |sub, value| {
            let sub: S = serde_json::from_value(sub)?;
            let value: V = serde_json::from_value(value)?;
            Ok(serde_json::to_value(f(sub, value))?)
        })
    }

    /// Run the reducer.
    #[inline]
    pub fn reduce(&self, sub: Value, value: Value) -> Result<Value, ReducerError> {
        (self.0)(sub, value)
    }

    /// Returns true if both handles point to the same function.
    #[inline]
    pub fn ptr_eq(&self, other: &Reducer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reducer").field(&"<fn>").finish()
    }
}

/// A reducer bundled with the path and action type it is registered under.
#[derive(Clone, Debug)]
pub struct ReducerSpec {
    /// Path the reducer operates on.
    pub path: Path,
    /// Action type that selects it.
    pub action_type: String,
    /// The reducer.
    pub reducer: Reducer,
}

impl ReducerSpec {
    /// Create a spec.
    pub fn new(path: impl Into<Path>, action_type: impl Into<String>, reducer: Reducer) -> Self {
        Self {
            path: path.into(),
            action_type: action_type.into(),
            reducer,
        }
    }
}

/// Two-level mapping `path -> action type -> reducer`.
///
/// The root path is a single slot no matter how it was spelled (`None`,
/// `""`, `"@"`). Entries are only ever added.
#[derive(Clone, Debug, Default)]
pub struct ReducerRegistry {
    entries: BTreeMap<Path, BTreeMap<String, Reducer>>,
}

impl ReducerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a reducer. Fails if `(path, action_type)` is taken; the
    /// existing entry is kept.
    pub fn register(
        &mut self,
        path: Path,
        action_type: impl Into<String>,
        reducer: Reducer,
    ) -> StoreResult<()> {
        let action_type = action_type.into();
        let by_type = self.entries.entry(path.clone()).or_default();
        if by_type.contains_key(&action_type) {
            return Err(StoreError::duplicate_reducer(path, action_type));
        }
        by_type.insert(action_type, reducer);
        Ok(())
    }

    /// Look up the reducer for `(path, action_type)`.
    pub fn get(&self, path: &Path, action_type: &str) -> Option<&Reducer> {
        self.entries.get(path)?.get(action_type)
    }

    /// Returns true if `(path, action_type)` has a reducer.
    pub fn contains(&self, path: &Path, action_type: &str) -> bool {
        self.get(path, action_type).is_some()
    }

    /// Action types registered at `path`, in sorted order.
    pub fn action_types(&self, path: &Path) -> Vec<&str> {
        self.entries
            .get(path)
            .map(|by_type| by_type.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Paths with at least one reducer, in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries
            .iter()
            .filter(|(_, by_type)| !by_type.is_empty())
            .map(|(path, _)| path)
    }

    /// Iterate over every `(path, action type, reducer)` entry.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str, &Reducer)> {
        self.entries.iter().flat_map(|(path, by_type)| {
            by_type
                .iter()
                .map(move |(action_type, reducer)| (path, action_type.as_str(), reducer))
        })
    }

    /// Total number of registered reducers.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn identity() -> Reducer {
        Reducer::new(|sub, _| sub)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = ReducerRegistry::new();
        registry
            .register(Path::parse("counter"), "INCREMENT", identity())
            .unwrap();
        registry
            .register(Path::parse("counter"), "DECREMENT", identity())
            .unwrap();

        assert!(registry.contains(&Path::parse("counter"), "INCREMENT"));
        assert!(!registry.contains(&Path::parse("counter"), "RESET"));
        assert_eq!(
            registry.action_types(&Path::parse("counter")),
            vec!["DECREMENT", "INCREMENT"]
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_duplicate_keeps_first() {
        let mut registry = ReducerRegistry::new();
        let first = identity();
        registry
            .register(Path::parse("a.b"), "set", first.clone())
            .unwrap();

        let err = registry
            .register(Path::parse("a.b"), "set", identity())
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateReducer { .. }));
        assert!(registry
            .get(&Path::parse("a.b"), "set")
            .unwrap()
            .ptr_eq(&first));
    }

    #[test]
    fn test_root_spellings_share_slot() {
        let mut registry = ReducerRegistry::new();
        registry
            .register(Path::from(None::<&str>), "REPLACE", identity())
            .unwrap();
        let err = registry
            .register(Path::parse("@"), "REPLACE", identity())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "reducer for state path \"@\" and type \"REPLACE\" already exists"
        );
    }

    #[test]
    fn test_iter_lists_everything() {
        let mut registry = ReducerRegistry::new();
        registry.register(Path::root(), "A", identity()).unwrap();
        registry.register(Path::parse("x"), "B", identity()).unwrap();

        let entries: Vec<(String, &str)> = registry
            .iter()
            .map(|(path, ty, _)| (path.to_string(), ty))
            .collect();
        assert_eq!(
            entries,
            vec![("@".to_string(), "A"), ("x".to_string(), "B")]
        );
        assert_eq!(registry.paths().count(), 2);
    }

    #[test]
    fn test_try_new_rejection() {
        let reducer = Reducer::try_new(|sub, value| {
            if value.is_number() {
                Ok(sub)
            } else {
                Err(ReducerError::rejected("amount must be a number"))
            }
        });
        let err = reducer.reduce(json!(0), json!("x")).unwrap_err();
        assert_eq!(err.to_string(), "amount must be a number");
    }

    #[test]
    fn test_typed_reducer() {
        #[derive(Serialize, Deserialize)]
        struct Sidebar {
            collapsed: bool,
        }

        let toggle = Reducer::typed(|s: Sidebar, _: Option<()>| Sidebar {
            collapsed: !s.collapsed,
        });
        let out = toggle
            .reduce(json!({"collapsed": false}), Value::Null)
            .unwrap();
        assert_eq!(out, json!({"collapsed": true}));

        let err = toggle.reduce(json!("nope"), Value::Null).unwrap_err();
        assert!(matches!(err, ReducerError::Serialization(_)));
    }
}
