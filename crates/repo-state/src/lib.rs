//! Path-addressable application state with reducers and change subscribers.
//!
//! `repo-state` keeps one JSON state tree per [`Store`]. Slices of state are
//! added with [`Store::add`], which deep-merges them and refuses to overwrite
//! anything that already exists. Mutations are actions `{path, type, value}`
//! routed to a reducer registered for that `(path, type)` pair.
//!
//! # Core Concepts
//!
//! - **Store**: owns the tree, the reducer registry and the subscriber set
//! - **Path**: dotted address of a node; `None`, `""` and `"@"` are the root
//! - **Reducer**: pure `(sub_state, value) -> new_sub_state`
//! - **Provider**: binding that mirrors the store into a UI-side cell
//! - **Accessors**: read sub-trees and dispatch from a [`RepoContext`]
//!
//! # State Transitions
//!
//! ```text
//! State' = reduce_state(State, Action, Registry)
//! ```
//!
//! - Only the addressed sub-tree and its ancestors are rebuilt
//! - `State` itself is never mutated; snapshots taken earlier stay valid
//! - Without a registered reducer, a type-less (or `set`) action replaces the
//!   node with its value
//!
//! # Quick Start
//!
//! ```
//! use repo_state::{Reducer, ReducerSpec, Store};
//! use serde_json::{json, Value};
//!
//! let store = Store::new();
//! store
//!     .add(
//!         json!({"todos": [], "filter": "all"}),
//!         vec![ReducerSpec::new(
//!             "todos",
//!             "ADD",
//!             Reducer::typed(|mut todos: Vec<String>, todo: String| {
//!                 todos.push(todo);
//!                 todos
//!             }),
//!         )],
//!     )
//!     .unwrap();
//!
//! store.dispatch("todos", "ADD", json!("write docs")).unwrap();
//! store.dispatch("filter", None::<&str>, json!("done")).unwrap();
//!
//! let state = store.snapshot().unwrap();
//! assert_eq!(state["todos"], json!(["write docs"]));
//! assert_eq!(state["filter"], "done");
//! ```
//!
//! # Binding
//!
//! ```
//! use repo_state::{use_repo_state, Provider, Store};
//! use serde_json::json;
//!
//! let store = Store::new();
//! store.add_state(json!({"ui": {"sidebar": false}})).unwrap();
//!
//! let provider = Provider::mount(&store);
//! let (open, set_open) = use_repo_state(&provider.context(), "ui.sidebar");
//! assert_eq!(open, Some(json!(false)));
//!
//! set_open.dispatch(None::<&str>, json!(true));
//! provider.flush().unwrap();
//! assert_eq!(store.snapshot().unwrap()["ui"]["sidebar"], true);
//! ```

mod access;
mod accessor;
mod action;
mod binding;
mod config;
mod error;
mod merge;
mod path;
mod reducer;
mod store;
mod subscription;

pub use access::{
    deep_clone, deep_clone_at, get_at_path, get_at_path_mut, path_exists, replace_at_path,
    with_replaced,
};
pub use accessor::{
    bind_dispatch, read_as, read_state, select, use_repo_dispatch, use_repo_state, BoundDispatch,
};
pub use action::{Action, ActionType};
pub use binding::{BindingAction, ContextDispatch, Provider, RepoContext};
pub use config::{DefaultReducerRule, StoreConfig};
pub use error::{value_type_name, StoreError, StoreResult};
pub use merge::deep_merge;
pub use path::{Path, ROOT};
pub use reducer::{Reducer, ReducerError, ReducerRegistry, ReducerSpec};
pub use store::{reduce_state, Store};
pub use subscription::{StateChange, SubscriberId, Subscription};

// Re-export for convenience
pub use serde_json::Value;
