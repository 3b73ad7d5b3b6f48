//! Core authorization types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::document::MAX_COMPARABLE_NUMBER;

/// Unique role identifier
pub type RoleKey = String;

/// Resource type identifier (e.g., "document", "case-note")
pub type ResourceType = String;

/// Named group of actors that permissions are granted to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role {
    /// Role key (e.g., "ROLE_USER", "ROLE_ADMIN")
    pub key: RoleKey,
}

impl Role {
    /// Create a new role
    pub fn new(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Action declared for a resource type
///
/// Two actions with the same key on different resource types are different
/// actions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    /// Action key (view, create, modify, delete, ...)
    pub key: String,

    /// Resource type the action is declared for
    pub resource_type: ResourceType,
}

impl Action {
    /// Reserved key used for nested container specifications
    pub const IGNORE: &'static str = "ignore";

    /// Create a new action
    pub fn new(resource_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            resource_type: resource_type.into(),
        }
    }

    /// Sentinel action for evaluating nested conditions on a related type
    pub fn ignore(resource_type: impl Into<String>) -> Self {
        Self::new(resource_type, Self::IGNORE)
    }

    /// Whether this is the reserved sentinel action
    pub fn is_ignore(&self) -> bool {
        self.key == Self::IGNORE
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.key)
    }
}

/// Authenticated actor on whose behalf a decision is made
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier
    pub id: String,

    /// Actor email address
    pub email: String,

    /// Roles held by the actor
    #[serde(default)]
    pub roles: Vec<RoleKey>,
}

impl Actor {
    /// Create a new actor without roles
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            roles: Vec::new(),
        }
    }

    /// Add a role to the actor
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Authorization request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    /// Resource type being accessed
    pub resource_type: ResourceType,

    /// Action being performed
    pub action: Action,
}

impl AuthorizationRequest {
    /// Create a request for an action key on a resource type
    pub fn new(resource_type: impl Into<String>, action: impl Into<String>) -> Self {
        let resource_type = resource_type.into();
        Self {
            action: Action::new(resource_type.clone(), action),
            resource_type,
        }
    }
}

/// Typed literal used by conditions
///
/// Deserialized from its natural JSON type: `true`, `42`, `4.5`, `"text"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl ConditionValue {
    /// Compare two values of compatible kinds
    ///
    /// Integers and floats compare exactly by numeric value. Any other kind
    /// mismatch has no ordering.
    pub fn compare(&self, other: &ConditionValue) -> Option<Ordering> {
        use ConditionValue::*;

        match (self, other) {
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Integer(a), Float(b)) => compare_integer_float(*a, *b),
            (Float(a), Integer(b)) => compare_integer_float(*b, *a).map(Ordering::reverse),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (String(a), String(b)) => Some(a.as_str().cmp(b.as_str())),
            _ => None,
        }
    }

    /// Convert a JSON scalar into a condition value
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::String(s.clone())),
            _ => None,
        }
    }

    /// Whether a number lies within `±2^53`
    ///
    /// JSON document values outside this range never match. Non-numbers are
    /// always within range.
    pub fn within_comparable_range(&self) -> bool {
        match self {
            Self::Integer(i) => i.unsigned_abs() <= MAX_COMPARABLE_NUMBER as u64,
            Self::Float(f) => f.abs() <= MAX_COMPARABLE_NUMBER as f64,
            Self::Boolean(_) | Self::String(_) => true,
        }
    }

    /// Kind name used in log and error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Exact comparison of an integer with a float, without rounding the integer
fn compare_integer_float(integer: i64, float: f64) -> Option<Ordering> {
    // 2^63, the first float above every i64
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;

    if float.is_nan() {
        return None;
    }
    if float >= LIMIT {
        return Some(Ordering::Less);
    }
    if float < -LIMIT {
        return Some(Ordering::Greater);
    }

    let whole = float.trunc();
    match integer.cmp(&(whole as i64)) {
        Ordering::Equal => 0.0_f64.partial_cmp(&(float - whole)),
        ordering => Some(ordering),
    }
}

impl fmt::Display for ConditionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for ConditionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for ConditionValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for ConditionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ConditionValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}
