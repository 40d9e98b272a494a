//! The store: one state tree, its reducer registry and its subscribers.
//!
//! All mutation funnels through [`reduce_state`], a pure function of
//! `(tree, action, registry)`. The store serializes commits behind a lock so
//! dispatch N always observes the result of dispatch N-1, then notifies
//! subscribers outside the lock.

use crate::access::{deep_clone_at, path_exists, with_replaced};
use crate::merge::deep_merge;
use crate::subscription::{StateChange, SubscriberId, SubscriberSet, Subscription};
use crate::{
    Action, ActionType, Path, Reducer, ReducerRegistry, ReducerSpec, StoreConfig, StoreError,
    StoreResult,
};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Compute the tree that results from applying `action` to `state` (pure).
///
/// - A non-root path must exist in `state`, else [`StoreError::UnknownPath`].
/// - A registered reducer for `(path, type)` receives a copy of the sub-tree
///   and the action value; its result replaces the sub-tree. An untyped
///   action looks up the reducer registered under the empty type.
/// - Without a reducer, the default reducer replaces the sub-tree with the
///   value when `config` allows it for this type; otherwise
///   [`StoreError::ReducerNotFound`].
///
/// `state` is never modified. Every ancestor of the target in the result is
/// a fresh copy.
///
/// # Examples
///
/// ```
/// use repo_state::{reduce_state, Action, Path, Reducer, ReducerRegistry, StoreConfig};
/// use serde_json::{json, Value};
///
/// let mut reducers = ReducerRegistry::new();
/// reducers
///     .register(
///         Path::parse("counter.value"),
///         "increment",
///         Reducer::new(|v: Value, amt: Value| json!(v.as_i64().unwrap_or(0) + amt.as_i64().unwrap_or(1))),
///     )
///     .unwrap();
///
/// let state = json!({"counter": {"value": 0}});
/// let action = Action::new("counter.value", "increment", json!(5));
/// let next = reduce_state(&state, &action, &reducers, &StoreConfig::default()).unwrap();
///
/// assert_eq!(next, json!({"counter": {"value": 5}}));
/// assert_eq!(state, json!({"counter": {"value": 0}}));
/// ```
pub fn reduce_state(
    state: &Value,
    action: &Action,
    reducers: &ReducerRegistry,
    config: &StoreConfig,
) -> StoreResult<Value> {
    let path = &action.path;
    if !path.is_root() && !path_exists(state, path) {
        return Err(StoreError::unknown_path(path.clone()));
    }

    let Some(reducer) = reducers.get(path, action.action_type.as_str().unwrap_or("")) else {
        if config.uses_default_reducer(&action.action_type) {
            tracing::trace!(path = %path, "default reducer");
            return with_replaced(state, path, action.value.clone());
        }
        return Err(StoreError::reducer_not_found(
            path.clone(),
            action.action_type.to_string(),
        ));
    };

    let sub = deep_clone_at(state, path)?;
    let next_sub = reducer
        .reduce(sub, action.value.clone())
        .map_err(|source| StoreError::ReducerFailed {
            path: path.clone(),
            action_type: action.action_type.to_string(),
            source,
        })?;
    with_replaced(state, path, next_sub)
}

#[derive(Default)]
struct StoreInner {
    state: Option<Value>,
    reducers: ReducerRegistry,
    revision: u64,
}

impl StoreInner {
    fn register(&mut self, spec: ReducerSpec) -> StoreResult<()> {
        let ReducerSpec {
            path,
            action_type,
            reducer,
        } = spec;
        if !path.is_root() {
            let resolves = self
                .state
                .as_ref()
                .is_some_and(|state| path_exists(state, &path));
            if !resolves {
                return Err(StoreError::unknown_path(path));
            }
        }
        tracing::debug!(path = %path, action_type = %action_type, "reducer registered");
        self.reducers.register(path, action_type, reducer)
    }

    fn commit(&mut self, next: Value) -> u64 {
        self.state = Some(next);
        self.revision += 1;
        self.revision
    }
}

/// Path-addressable state container.
///
/// `Store` is a cheap handle: clones share the same tree, registry and
/// subscribers. Create one per application (or per test) and hand it to
/// whatever needs it.
///
/// Reducers run while the store is locked and must not call back into it.
///
/// # Example
///
/// ```
/// use repo_state::{Reducer, ReducerSpec, Store};
/// use serde_json::{json, Value};
///
/// let store = Store::new();
/// store
///     .add(
///         json!({"counter": {"value": 0}}),
///         vec![ReducerSpec::new(
///             "counter.value",
///             "increment",
///             Reducer::new(|v: Value, amt: Value| {
///                 json!(v.as_i64().unwrap_or(0) + amt.as_i64().unwrap_or(1))
///             }),
///         )],
///     )
///     .unwrap();
///
/// store.dispatch("counter.value", "increment", json!(5)).unwrap();
/// store.dispatch("counter.value", "increment", Value::Null).unwrap();
/// assert_eq!(store.snapshot().unwrap(), json!({"counter": {"value": 6}}));
/// ```
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
    subscribers: SubscriberSet,
    config: Arc<StoreConfig>,
}

impl Store {
    /// Create an empty store with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with a custom configuration.
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config: Arc::new(config),
            ..Self::default()
        }
    }

    /// The store's configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // The tree is only replaced after a reducer returns, so a guard
        // poisoned by a panicking reducer still holds the last commit.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a slice of state and its reducers.
    ///
    /// The first call initializes the tree; later calls deep-merge into it
    /// and fail with [`StoreError::StateConflict`] if any existing value
    /// would be overwritten. Reducers are then registered in order; a
    /// failing registration stops the batch but keeps the merged state and
    /// earlier registrations. Subscribers are notified whenever the tree
    /// changed.
    pub fn add<I>(&self, state: Value, reducers: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = ReducerSpec>,
    {
        if !state.is_object() {
            return Err(StoreError::invalid_argument(&state));
        }

        let mut inner = self.lock();
        let next = match &inner.state {
            None => state,
            Some(current) => deep_merge(current, &state)?,
        };
        let revision = inner.commit(next);

        let registered = reducers
            .into_iter()
            .try_for_each(|spec| inner.register(spec));

        let committed = inner.state.clone().unwrap_or_default();
        drop(inner);

        tracing::debug!(revision, "state added");
        self.subscribers.notify(
            &StateChange {
                state: &committed,
                revision,
            },
            None,
        );
        registered
    }

    /// Add a slice of state without reducers.
    pub fn add_state(&self, state: Value) -> StoreResult<()> {
        self.add(state, Vec::new())
    }

    /// Register a reducer for `(path, action_type)`.
    ///
    /// `path` must exist in the current tree (the root always does). Fails
    /// with [`StoreError::DuplicateReducer`] if the slot is taken.
    pub fn add_reducer(
        &self,
        path: impl Into<Path>,
        action_type: impl Into<String>,
        reducer: Reducer,
    ) -> StoreResult<()> {
        let spec = ReducerSpec::new(path, action_type, reducer);
        self.lock().register(spec)
    }

    /// Apply an action from outside any binding and notify all subscribers.
    pub fn dispatch(
        &self,
        path: impl Into<Path>,
        action_type: impl Into<ActionType>,
        value: Value,
    ) -> StoreResult<()> {
        self.dispatch_action(Action::new(path, action_type, value))
    }

    /// [`Store::dispatch`] taking a prepared [`Action`].
    pub fn dispatch_action(&self, action: Action) -> StoreResult<()> {
        self.commit_action(&action, None).map(|_| ())
    }

    /// Reduce, commit and notify everyone except `origin`.
    pub(crate) fn commit_action(
        &self,
        action: &Action,
        origin: Option<SubscriberId>,
    ) -> StoreResult<(Value, u64)> {
        let mut inner = self.lock();
        let current = inner.state.as_ref().ok_or(StoreError::NotInitialized)?;
        let next = reduce_state(current, action, &inner.reducers, &self.config)?;
        let revision = inner.commit(next.clone());
        drop(inner);

        tracing::debug!(
            path = %action.path,
            action_type = %action.action_type,
            revision,
            "action committed"
        );
        self.subscribers.notify(
            &StateChange {
                state: &next,
                revision,
            },
            origin,
        );
        Ok((next, revision))
    }

    /// Compute the result of `action` against the current tree without
    /// committing it or notifying anyone.
    pub fn reduce(&self, action: &Action) -> StoreResult<Value> {
        let inner = self.lock();
        let current = inner.state.as_ref().ok_or(StoreError::NotInitialized)?;
        reduce_state(current, action, &inner.reducers, &self.config)
    }

    /// Deep copy of the current tree.
    pub fn snapshot(&self) -> StoreResult<Value> {
        self.lock().state.clone().ok_or(StoreError::NotInitialized)
    }

    pub(crate) fn snapshot_with_revision(&self) -> Option<(Value, u64)> {
        let inner = self.lock();
        inner.state.clone().map(|state| (state, inner.revision))
    }

    /// Returns true once state has been added.
    pub fn is_initialized(&self) -> bool {
        self.lock().state.is_some()
    }

    /// Number of commits so far.
    pub fn revision(&self) -> u64 {
        self.lock().revision
    }

    /// Whether `path` resolves against the current tree.
    pub fn has_path(&self, path: impl Into<Path>) -> bool {
        let path = path.into();
        let inner = self.lock();
        path.is_root() || inner.state.as_ref().is_some_and(|s| path_exists(s, &path))
    }

    /// Copy of the reducer registry, for introspection.
    pub fn reducers(&self) -> ReducerRegistry {
        self.lock().reducers.clone()
    }

    /// Register a callback invoked after every out-of-band commit.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&StateChange<'_>) + Send + Sync + 'static,
    {
        self.subscribers.subscribe(callback)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Drop the tree, every reducer and every subscriber.
    ///
    /// The revision counter keeps counting so stale notifications stay
    /// recognizable.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.state = None;
        inner.reducers = ReducerRegistry::new();
        drop(inner);
        self.subscribers.clear();
        tracing::debug!("store cleared");
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Store")
            .field("initialized", &inner.state.is_some())
            .field("revision", &inner.revision)
            .field("reducers", &inner.reducers.len())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DefaultReducerRule;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn increment() -> Reducer {
        Reducer::new(|v: Value, amt: Value| {
            json!(v.as_i64().unwrap_or(0) + amt.as_i64().unwrap_or(1))
        })
    }

    #[test]
    fn test_snapshot_before_add_fails() {
        let store = Store::new();
        assert!(matches!(store.snapshot(), Err(StoreError::NotInitialized)));
        assert!(matches!(
            store.dispatch("a", "x", json!(1)),
            Err(StoreError::NotInitialized)
        ));
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_add_rejects_non_objects() {
        let store = Store::new();
        for bad in [json!(null), json!(3), json!("s"), json!([1])] {
            let err = store.add_state(bad).unwrap_err();
            assert!(matches!(err, StoreError::InvalidArgument { .. }));
        }
        assert!(!store.is_initialized());
    }

    #[test]
    fn test_add_then_merge() {
        let store = Store::new();
        store.add_state(json!({"user": {"name": "John"}})).unwrap();
        store.add_state(json!({"user": {"age": 30}})).unwrap();
        assert_eq!(
            store.snapshot().unwrap(),
            json!({"user": {"name": "John", "age": 30}})
        );
    }

    #[test]
    fn test_add_conflict_leaves_state() {
        let store = Store::new();
        store.add_state(json!({"user": {"name": "John"}})).unwrap();
        let err = store
            .add_state(json!({"user": {"name": "Jane"}}))
            .unwrap_err();
        assert!(matches!(err, StoreError::StateConflict { ref path } if path.to_string() == "user.name"));
        assert_eq!(store.snapshot().unwrap(), json!({"user": {"name": "John"}}));
    }

    #[test]
    fn test_add_reducer_unknown_path() {
        let store = Store::new();
        store.add_state(json!({"existing": 1})).unwrap();
        let err = store
            .add_reducer("missing.path", "X", increment())
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownPath { .. }));
    }

    #[test]
    fn test_add_reducer_at_root_before_state() {
        let store = Store::new();
        store.add_reducer("@", "RESET", increment()).unwrap();
        assert!(store.reducers().contains(&Path::root(), "RESET"));

        let err = store.add_reducer("a", "X", increment()).unwrap_err();
        assert!(matches!(err, StoreError::UnknownPath { .. }));
    }

    #[test]
    fn test_add_partial_reducer_batch() {
        let store = Store::new();
        let err = store
            .add(
                json!({"a": 1}),
                vec![
                    ReducerSpec::new("a", "INC", increment()),
                    ReducerSpec::new("b", "INC", increment()),
                    ReducerSpec::new("a", "DEC", increment()),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownPath { .. }));

        let reducers = store.reducers();
        assert!(reducers.contains(&Path::parse("a"), "INC"));
        assert!(!reducers.contains(&Path::parse("a"), "DEC"));
        assert_eq!(store.snapshot().unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_dispatch_counter() {
        let store = Store::new();
        store
            .add(
                json!({"counter": {"value": 0}}),
                vec![ReducerSpec::new("counter.value", "increment", increment())],
            )
            .unwrap();

        store
            .dispatch("counter.value", "increment", json!(5))
            .unwrap();
        assert_eq!(store.snapshot().unwrap(), json!({"counter": {"value": 5}}));

        store
            .dispatch("counter.value", "increment", Value::Null)
            .unwrap();
        assert_eq!(store.snapshot().unwrap(), json!({"counter": {"value": 6}}));
    }

    #[test]
    fn test_default_reducer() {
        let store = Store::new();
        store.add_state(json!({"data": {"items": []}})).unwrap();
        store
            .dispatch("data", None::<&str>, json!({"items": [1, 2, 3]}))
            .unwrap();
        assert_eq!(
            store.snapshot().unwrap(),
            json!({"data": {"items": [1, 2, 3]}})
        );
    }

    #[test]
    fn test_set_alias_follows_config() {
        let lenient = Store::new();
        lenient.add_state(json!({"flag": false})).unwrap();
        lenient.dispatch("flag", "Set", json!(true)).unwrap();
        assert_eq!(lenient.snapshot().unwrap()["flag"], true);

        let strict =
            Store::with_config(StoreConfig::default().with_default_reducer(DefaultReducerRule::NullOnly));
        strict.add_state(json!({"flag": false})).unwrap();
        let err = strict.dispatch("flag", "set", json!(true)).unwrap_err();
        assert!(matches!(err, StoreError::ReducerNotFound { .. }));
    }

    #[test]
    fn test_registered_set_reducer_wins() {
        let store = Store::new();
        store
            .add(
                json!({"name": "john"}),
                vec![ReducerSpec::new(
                    "name",
                    "set",
                    Reducer::new(|_, v: Value| json!(v.as_str().unwrap_or("").to_uppercase())),
                )],
            )
            .unwrap();
        store.dispatch("name", "set", json!("jane")).unwrap();
        assert_eq!(store.snapshot().unwrap()["name"], "JANE");
    }

    #[test]
    fn test_reduce_does_not_commit() {
        let store = Store::new();
        store
            .add(
                json!({"n": 1}),
                vec![ReducerSpec::new("n", "INC", increment())],
            )
            .unwrap();
        let preview = store.reduce(&Action::new("n", "INC", json!(10))).unwrap();
        assert_eq!(preview, json!({"n": 11}));
        assert_eq!(store.snapshot().unwrap(), json!({"n": 1}));
    }

    #[test]
    fn test_reducer_failure_commits_nothing() {
        let store = Store::new();
        store
            .add(
                json!({"n": 1}),
                vec![ReducerSpec::new(
                    "n",
                    "FAIL",
                    Reducer::try_new(|_, _| Err(crate::ReducerError::rejected("nope"))),
                )],
            )
            .unwrap();
        let revision = store.revision();
        let err = store.dispatch("n", "FAIL", Value::Null).unwrap_err();
        assert!(matches!(err, StoreError::ReducerFailed { .. }));
        assert_eq!(store.revision(), revision);
        assert_eq!(store.snapshot().unwrap(), json!({"n": 1}));
    }

    #[test]
    fn test_untyped_action_uses_empty_type_reducer() {
        let store = Store::new();
        store.add_state(json!({"n": 1, "m": 1})).unwrap();
        store
            .add_reducer(
                "n",
                "",
                Reducer::new(|_, amount: Value| json!(amount.as_i64().unwrap_or(0) * 100)),
            )
            .unwrap();

        store.dispatch("n", "", json!(7)).unwrap();
        assert_eq!(store.snapshot().unwrap()["n"], 700);
        store.dispatch("n", None::<&str>, json!(2)).unwrap();
        assert_eq!(store.snapshot().unwrap()["n"], 200);

        // Paths without one still fall back to plain replacement.
        store.dispatch("m", None::<&str>, json!(5)).unwrap();
        assert_eq!(store.snapshot().unwrap()["m"], 5);
    }

    #[test]
    fn test_has_path() {
        let store = Store::new();
        assert!(store.has_path("@"));
        assert!(!store.has_path("a"));

        store.add_state(json!({"a": {"list": [{"b": 1}]}})).unwrap();
        assert!(store.has_path("a.list.0.b"));
        assert!(!store.has_path("a.list.1"));
        assert!(!store.has_path("a.missing"));
    }

    #[test]
    fn test_subscribers_see_add_and_dispatch() {
        let store = Store::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let _sub = store.subscribe(move |change| {
            assert!(change.state.is_object());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        store.add_state(json!({"x": 0})).unwrap();
        store.dispatch("x", None::<&str>, json!(1)).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        assert!(store.dispatch("y", None::<&str>, json!(1)).is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clear_resets_everything() {
        let store = Store::new();
        let _sub = store.subscribe(|_| {});
        store
            .add(json!({"n": 0}), vec![ReducerSpec::new("n", "INC", increment())])
            .unwrap();

        store.clear();
        assert!(!store.is_initialized());
        assert!(store.reducers().is_empty());
        assert_eq!(store.subscriber_count(), 0);
        assert!(store.revision() > 0);
    }

    #[test]
    fn test_clones_share_state() {
        let a = Store::new();
        let b = a.clone();
        a.add_state(json!({"shared": true})).unwrap();
        assert_eq!(b.snapshot().unwrap(), json!({"shared": true}));
    }
}
