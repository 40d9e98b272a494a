//! Store configuration.

use serde::{Deserialize, Serialize};

/// When an action with no registered reducer falls back to the default
/// reducer (replace the addressed node with the action value).
///
/// A registered reducer always wins: `(path, "set")` with a reducer runs that
/// reducer under either rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultReducerRule {
    /// Only actions without a type.
    NullOnly,
    /// Actions without a type, and any case spelling of `set`.
    #[default]
    NullOrSet,
}

/// Options for a [`Store`](crate::Store).
///
/// Deserializable so hosts can embed it in their own configuration files;
/// missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Default-reducer fallback rule.
    pub default_reducer: DefaultReducerRule,
}

impl StoreConfig {
    /// Set the default-reducer fallback rule.
    #[must_use]
    pub fn with_default_reducer(mut self, rule: DefaultReducerRule) -> Self {
        self.default_reducer = rule;
        self
    }

    /// Whether an action of this type falls back to the default reducer.
    pub(crate) fn uses_default_reducer(&self, action_type: &crate::ActionType) -> bool {
        match self.default_reducer {
            DefaultReducerRule::NullOnly => action_type.is_absent(),
            DefaultReducerRule::NullOrSet => {
                action_type.is_absent() || action_type.is_set_alias()
            }
        }
    }
}
