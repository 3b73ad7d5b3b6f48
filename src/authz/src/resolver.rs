//! Placeholder resolution for condition values
//!
//! A string literal of the exact form `${name}` is a placeholder and is
//! replaced by a property of the current actor before comparison.

use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::{AuthzError, Result};
use crate::types::{Actor, ConditionValue};

/// Source of the current actor's identity
pub trait ActorContext: Send + Sync {
    /// Identifier of the current actor
    fn current_actor_id(&self) -> Result<String>;

    /// Email address of the current actor
    fn current_actor_email(&self) -> Result<String>;
}

impl ActorContext for Actor {
    fn current_actor_id(&self) -> Result<String> {
        Ok(self.id.clone())
    }

    fn current_actor_email(&self) -> Result<String> {
        Ok(self.email.clone())
    }
}

/// Known placeholders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    CurrentUserId,
    CurrentUserEmail,
}

impl Placeholder {
    /// Placeholder name inside `${...}`
    pub fn name(self) -> &'static str {
        match self {
            Self::CurrentUserId => "currentUserId",
            Self::CurrentUserEmail => "currentUserEmail",
        }
    }

    /// Detect a placeholder literal
    ///
    /// Returns `Ok(None)` for ordinary literals and an error for `${...}`
    /// literals with an unknown name.
    pub fn detect(value: &ConditionValue) -> Result<Option<Self>> {
        let Some(text) = value.as_str() else {
            return Ok(None);
        };

        let pattern = placeholder_pattern().ok_or_else(|| {
            AuthzError::Configuration("Placeholder pattern failed to compile".to_string())
        })?;

        match pattern.captures(text) {
            Some(captures) => captures[1].parse().map(Some),
            None => Ok(None),
        }
    }
}

impl FromStr for Placeholder {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "currentUserId" => Ok(Self::CurrentUserId),
            "currentUserEmail" => Ok(Self::CurrentUserEmail),
            other => Err(AuthzError::Configuration(format!(
                "Unknown placeholder '${{{}}}'",
                other
            ))),
        }
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}}}", self.name())
    }
}

fn placeholder_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\$\{([^}]*)\}$").ok())
        .as_ref()
}

/// Resolves placeholder literals against an actor context
pub struct ValueResolver<'a> {
    actor: &'a dyn ActorContext,
}

impl<'a> ValueResolver<'a> {
    pub fn new(actor: &'a dyn ActorContext) -> Self {
        Self { actor }
    }

    /// Resolve a literal
    ///
    /// Non-placeholder values are returned unchanged.
    pub fn resolve(&self, value: &ConditionValue) -> Result<ConditionValue> {
        match Placeholder::detect(value)? {
            Some(Placeholder::CurrentUserId) => self.actor.current_actor_id().map(ConditionValue::String),
            Some(Placeholder::CurrentUserEmail) => {
                self.actor.current_actor_email().map(ConditionValue::String)
            }
            None => Ok(value.clone()),
        }
    }
}
