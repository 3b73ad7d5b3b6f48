//! JSON path expressions over structured payloads
//!
//! Supported syntax: `$`, `.key`, `['key']`, `["key"]` and `[index]`, e.g.
//! `$.assignee.email` or `$.items[0]['amount']`. The same parsed path is
//! applied to in-memory documents and lowered to the SQL dialects' JSON
//! functions, so both evaluation modes select the same value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::error::{AuthzError, Result};

/// One step of a JSON path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

/// Parsed JSON path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JsonPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl JsonPath {
    /// Parse a JSON path expression
    pub fn parse(input: &str) -> Result<Self> {
        let chars: Vec<char> = input.trim().chars().collect();
        let mut segments = Vec::new();
        let mut i = 0;

        if chars.first() == Some(&'$') {
            i += 1;
        } else if !chars.is_empty() && chars[0] != '.' && chars[0] != '[' {
            // Bare "a.b" is accepted as "$.a.b"
            let (key, next) = read_key(&chars, 0, input)?;
            segments.push(PathSegment::Key(key));
            i = next;
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    let (key, next) = read_key(&chars, i + 1, input)?;
                    segments.push(PathSegment::Key(key));
                    i = next;
                }
                '[' => {
                    let close = chars[i..]
                        .iter()
                        .position(|c| *c == ']')
                        .map(|offset| i + offset)
                        .ok_or_else(|| invalid(input, "unterminated '['"))?;
                    let inner: String = chars[i + 1..close].iter().collect();
                    segments.push(parse_bracket(&inner, input)?);
                    i = close + 1;
                }
                c => return Err(invalid(input, &format!("unexpected character '{}'", c))),
            }
        }

        Ok(Self {
            raw: input.to_string(),
            segments,
        })
    }

    /// Returns the segments of this path
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Returns the raw path string
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Select the value at this path, if present
    pub fn select<'v>(&self, document: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(document, |current, segment| match segment {
                PathSegment::Key(key) => current.as_object()?.get(key),
                PathSegment::Index(index) => current.as_array()?.get(*index),
            })
    }

    /// Path in SQLite `json_extract` syntax: `$."a"[0]`
    pub fn to_sqlite(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => {
                    out.push_str(".\"");
                    out.push_str(key);
                    out.push('"');
                }
                PathSegment::Index(index) => out.push_str(&format!("[{}]", index)),
            }
        }
        out
    }

    /// Path in PostgreSQL strict SQL/JSON path syntax: `strict $."a"[0]`
    ///
    /// Strict mode keeps keys and indexes apart: a key step on an array or an
    /// index step on an object selects nothing, as in [`select`](Self::select).
    pub fn to_postgres(&self) -> String {
        let mut out = String::from("strict $");
        for segment in &self.segments {
            match segment {
                PathSegment::Key(key) => {
                    out.push_str(".\"");
                    out.push_str(key);
                    out.push('"');
                }
                PathSegment::Index(index) => out.push_str(&format!("[{}]", index)),
            }
        }
        out
    }
}

fn invalid(input: &str, reason: &str) -> AuthzError {
    AuthzError::InvalidJsonPath(format!("'{}': {}", input, reason))
}

/// Keys are inlined into SQL, so quoting and structural characters are rejected.
fn validate_key(key: &str, input: &str) -> Result<()> {
    if key.is_empty() {
        return Err(invalid(input, "empty key"));
    }
    if let Some(c) = key
        .chars()
        .find(|c| c.is_whitespace() || "'\"{},\\[].$".contains(*c))
    {
        return Err(invalid(input, &format!("character '{}' is not allowed in keys", c)));
    }
    Ok(())
}

fn read_key(chars: &[char], start: usize, input: &str) -> Result<(String, usize)> {
    let end = chars[start..]
        .iter()
        .position(|c| *c == '.' || *c == '[')
        .map(|offset| start + offset)
        .unwrap_or(chars.len());
    let key: String = chars[start..end].iter().collect();
    validate_key(&key, input)?;
    Ok((key, end))
}

fn parse_bracket(inner: &str, input: &str) -> Result<PathSegment> {
    let quoted = inner
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| inner.strip_prefix('"').and_then(|s| s.strip_suffix('"')));

    if let Some(key) = quoted {
        validate_key(key, input)?;
        return Ok(PathSegment::Key(key.to_string()));
    }

    inner
        .parse::<usize>()
        .map(PathSegment::Index)
        .map_err(|_| invalid(input, &format!("invalid index '{}'", inner)))
}

impl FromStr for JsonPath {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for JsonPath {
    type Error = AuthzError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<JsonPath> for String {
    fn from(path: JsonPath) -> Self {
        path.raw
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
