//! Dotted property paths
//!
//! A field path names a property reachable from a resource instance by
//! walking embedded objects: `child.property`, `address.city`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthzError, Result};

/// Parsed dot-separated property path
///
/// # Examples
///
/// ```
/// use caseflow_authz::FieldPath;
///
/// let path: FieldPath = "child.property".parse().unwrap();
/// assert_eq!(path.segments(), &["child".to_string(), "property".to_string()]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    /// Original path string
    raw: String,
    /// Parsed segments
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse a dotted path
    pub fn new(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(AuthzError::InvalidInput("Field path cannot be empty".to_string()));
        }

        let segments: Vec<String> = s.split('.').map(|s| s.to_string()).collect();

        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(AuthzError::InvalidInput(format!(
                "Field path '{}' contains an empty segment",
                s
            )));
        }

        Ok(Self {
            raw: s.to_string(),
            segments,
        })
    }

    /// Returns the segments of this path
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Returns the raw path string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of segments
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl FromStr for FieldPath {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.raw
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
