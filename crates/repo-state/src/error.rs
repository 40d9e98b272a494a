//! Error types for repo-state operations.

use crate::Path;
use thiserror::Error;

/// Result type alias for repo-state operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while adding, reducing or reading store state.
///
/// Every variant describes a wiring or usage mistake. None of them is
/// transient, so callers never retry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Snapshot or dispatch requested before any state was added.
    #[error("state not initialized")]
    NotInitialized,

    /// `add` was called with something other than an object.
    #[error("state to add must be an object, found {found}")]
    InvalidArgument {
        /// Type name of the rejected payload.
        found: &'static str,
    },

    /// Merging would overwrite a value that already exists.
    #[error("state conflict detected at path: {path}")]
    StateConflict {
        /// Dotted path of the colliding key.
        path: Path,
    },

    /// A reducer registration or dispatch referenced a path that does not
    /// resolve against the current tree.
    #[error("state path \"{path}\" does not exist")]
    UnknownPath {
        /// The unresolved path.
        path: Path,
    },

    /// A reducer is already registered for this path and action type.
    #[error("reducer for state path \"{path}\" and type \"{action_type}\" already exists")]
    DuplicateReducer {
        /// Registry key of the path.
        path: Path,
        /// Action type of the existing registration.
        action_type: String,
    },

    /// No reducer is registered and the default reducer does not apply.
    #[error("no reducer found for state path: {path} and type: {action_type}")]
    ReducerNotFound {
        /// Registry key of the path.
        path: Path,
        /// Requested action type.
        action_type: String,
    },

    /// Path-scoped deep copy hit a missing segment.
    #[error("invalid path: {path}")]
    InvalidPathAccess {
        /// The path being traversed.
        path: Path,
    },

    /// A registered reducer returned an error; nothing was committed.
    #[error("reducer for state path \"{path}\" and type \"{action_type}\" failed: {source}")]
    ReducerFailed {
        /// Registry key of the path.
        path: Path,
        /// Action type that selected the reducer.
        action_type: String,
        /// What the reducer reported.
        #[source]
        source: crate::ReducerError,
    },

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Create an invalid argument error for the given payload.
    #[inline]
    pub fn invalid_argument(value: &serde_json::Value) -> Self {
        StoreError::InvalidArgument {
            found: value_type_name(value),
        }
    }

    /// Create a state conflict error.
    #[inline]
    pub fn state_conflict(path: Path) -> Self {
        StoreError::StateConflict { path }
    }

    /// Create an unknown path error.
    #[inline]
    pub fn unknown_path(path: Path) -> Self {
        StoreError::UnknownPath { path }
    }

    /// Create a duplicate reducer error.
    #[inline]
    pub fn duplicate_reducer(path: Path, action_type: impl Into<String>) -> Self {
        StoreError::DuplicateReducer {
            path,
            action_type: action_type.into(),
        }
    }

    /// Create a reducer not found error.
    #[inline]
    pub fn reducer_not_found(path: Path, action_type: impl Into<String>) -> Self {
        StoreError::ReducerNotFound {
            path,
            action_type: action_type.into(),
        }
    }

    /// Create an invalid path access error.
    #[inline]
    pub fn invalid_path_access(path: Path) -> Self {
        StoreError::InvalidPathAccess { path }
    }

    /// Path attached to this error, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            StoreError::StateConflict { path }
            | StoreError::UnknownPath { path }
            | StoreError::DuplicateReducer { path, .. }
            | StoreError::ReducerNotFound { path, .. }
            | StoreError::InvalidPathAccess { path }
            | StoreError::ReducerFailed { path, .. } => Some(path),
            StoreError::NotInitialized
            | StoreError::InvalidArgument { .. }
            | StoreError::Serialization(_) => None,
        }
    }
}

/// Get the type name of a JSON value.
#[inline]
pub fn value_type_name(v: &serde_json::Value) -> &'static str {
    match v {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
