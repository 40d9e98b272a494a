//! Actions: the transient `(path, type, value)` triple describing one mutation.

use crate::Path;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Action type selecting a reducer at a path.
///
/// An absent type (or an empty string) asks for the default reducer, which
/// replaces the addressed sub-tree with the action value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// No type given.
    #[default]
    Absent,
    /// A named action type.
    Named(String),
}

impl ActionType {
    /// Create a named action type. Empty names are treated as absent.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            ActionType::Absent
        } else {
            ActionType::Named(name)
        }
    }

    /// Name of the type, if any.
    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ActionType::Absent => None,
            ActionType::Named(name) => Some(name),
        }
    }

    /// Returns true if no type was given.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, ActionType::Absent)
    }

    /// Returns true for any case spelling of `set`.
    #[inline]
    pub fn is_set_alias(&self) -> bool {
        self.as_str()
            .is_some_and(|name| name.eq_ignore_ascii_case("set"))
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("null"))
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        ActionType::named(s)
    }
}

impl From<String> for ActionType {
    fn from(s: String) -> Self {
        ActionType::named(s)
    }
}

impl From<&String> for ActionType {
    fn from(s: &String) -> Self {
        ActionType::named(s.as_str())
    }
}

impl From<Option<&str>> for ActionType {
    fn from(s: Option<&str>) -> Self {
        s.map(ActionType::named).unwrap_or_default()
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ActionType::Absent => serializer.serialize_none(),
            ActionType::Named(name) => serializer.serialize_str(name),
        }
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(ActionType::named).unwrap_or_default())
    }
}

/// A requested mutation.
///
/// Actions deserialize from `{"path": .., "type": .., "value": ..}`; every
/// field is optional, so `{}` is a default-reducer action on the root that
/// sets it to `null`.
///
/// # Examples
///
/// ```
/// use repo_state::{Action, ActionType, Path};
/// use serde_json::json;
///
/// let action: Action =
///     serde_json::from_value(json!({"path": "counter.value", "type": "increment", "value": 5}))
///         .unwrap();
/// assert_eq!(action.path, Path::parse("counter.value"));
/// assert_eq!(action.action_type, ActionType::named("increment"));
/// assert_eq!(action.value, json!(5));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Target node.
    #[serde(default)]
    pub path: Path,
    /// Reducer selector.
    #[serde(rename = "type", default)]
    pub action_type: ActionType,
    /// Argument handed to the reducer. `Null` when not provided.
    #[serde(default)]
    pub value: Value,
}

impl Action {
    /// Create an action.
    pub fn new(path: impl Into<Path>, action_type: impl Into<ActionType>, value: Value) -> Self {
        Self {
            path: path.into(),
            action_type: action_type.into(),
            value,
        }
    }

    /// Create a default-reducer action that replaces the node at `path`.
    pub fn set(path: impl Into<Path>, value: Value) -> Self {
        Self::new(path, ActionType::Absent, value)
    }
}
