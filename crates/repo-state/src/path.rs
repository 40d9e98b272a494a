//! Dotted path representation for addressing nodes of the state tree.
//!
//! A path is a sequence of object keys. The empty path addresses the tree
//! root and is written `@`. Textual paths are parsed by trimming surrounding
//! whitespace and splitting on `.`; segments are otherwise kept verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Textual sentinel for the root path.
pub const ROOT: &str = "@";

/// A path into the state tree.
///
/// # Examples
///
/// ```
/// use repo_state::Path;
///
/// let path = Path::parse("app.ui.sidebar");
/// assert_eq!(path.len(), 3);
/// assert_eq!(path.to_string(), "app.ui.sidebar");
///
/// assert!(Path::parse("@").is_root());
/// assert!(Path::parse("").is_root());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path(Vec<String>);

impl Path {
    /// Create an empty path (root).
    #[inline]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create an empty path (alias for `new`).
    #[inline]
    pub fn root() -> Self {
        Self::new()
    }

    /// Parse a dotted path.
    ///
    /// Empty input and `@` (after trimming) denote the root.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed == ROOT {
            return Self::root();
        }
        Self(trimmed.split('.').map(str::to_owned).collect())
    }

    /// Push a key segment onto the path (mutating).
    #[inline]
    pub fn push(&mut self, k: impl Into<String>) {
        self.0.push(k.into());
    }

    /// Pop the last key segment off the path (mutating).
    #[inline]
    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }

    /// Get the segments of this path.
    #[inline]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Check if this path addresses the root.
    #[inline]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the number of segments in this path.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Alias for [`Path::is_root`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check if `prefix` is this path or one of its ancestors.
    #[inline]
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Iterate over the segments.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str(ROOT)
        } else {
            f.write_str(&self.0.join("."))
        }
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        Path::parse(s)
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::parse(&s)
    }
}

impl From<&String> for Path {
    fn from(s: &String) -> Self {
        Path::parse(s)
    }
}

/// `None` is the root, the same as `"@"`.
impl From<Option<&str>> for Path {
    fn from(s: Option<&str>) -> Self {
        s.map(Path::parse).unwrap_or_default()
    }
}

/// The root serializes as `null`, anything else as its dotted form.
impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_root() {
            serializer.serialize_none()
        } else {
            serializer.collect_str(self)
        }
    }
}

impl<'de> Deserialize<'de> for Path {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().map(Path::parse).unwrap_or_default())
    }
}

/// Construct a `Path` from literal key segments.
///
/// Each argument is one segment, taken verbatim (no dot splitting).
///
/// # Examples
///
/// ```
/// use repo_state::{path, Path};
///
/// let p = path!("counter", "value");
/// assert_eq!(p, Path::parse("counter.value"));
/// assert!(path!().is_root());
/// ```
#[macro_export]
macro_rules! path {
    () => {
        $crate::Path::root()
    };
    ($($seg:expr),+ $(,)?) => {{
        let mut p = $crate::Path::root();
        $(
            p.push($seg);
        )+
        p
    }};
}
