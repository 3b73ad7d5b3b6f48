//! Error types for the authorization engine
//!
//! A denied request is not an error: evaluation returns `Ok(false)`. The
//! variants below describe misconfigured permissions, schemas or mappers and
//! must reach the caller unchanged.

use thiserror::Error;

/// Authorization engine errors
#[derive(Debug, Error)]
pub enum AuthzError {
    /// A dotted field path does not resolve on the resource type
    #[error("Field '{path}' not found on resource type '{resource_type}'")]
    FieldNotFound {
        resource_type: String,
        path: String,
    },

    /// Invalid permission configuration (e.g. unknown placeholder)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No entity mapper registered for a container relation
    #[error("No entity mapper registered from '{from}' to '{to}'")]
    MapperNotFound { from: String, to: String },

    /// More than one entity mapper registered for a container relation
    #[error("Ambiguous entity mapper from '{from}' to '{to}'")]
    AmbiguousMapper { from: String, to: String },

    /// Resource type has no registered schema
    #[error("Unknown resource type: {0}")]
    UnknownResourceType(String),

    /// Malformed JSON path expression
    #[error("Invalid JSON path: {0}")]
    InvalidJsonPath(String),

    /// Explicit denial raised by `require_permission`
    #[error("Access denied: '{action}' on '{resource_type}'")]
    AccessDenied {
        resource_type: String,
        action: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON (de)serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// Whether this error points at broken deployment data rather than a
    /// runtime denial.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::FieldNotFound { .. }
                | Self::Configuration(_)
                | Self::MapperNotFound { .. }
                | Self::AmbiguousMapper { .. }
                | Self::UnknownResourceType(_)
                | Self::InvalidJsonPath(_)
        )
    }

    pub(crate) fn field_not_found(resource_type: impl Into<String>, path: impl Into<String>) -> Self {
        Self::FieldNotFound {
            resource_type: resource_type.into(),
            path: path.into(),
        }
    }
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
