//! Permission configuration documents
//!
//! Permissions are deployed from JSON documents of the form
//!
//! ```json
//! {
//!   "permissions": [
//!     {
//!       "resourceType": "document",
//!       "action": "view",
//!       "roleKey": "ROLE_USER",
//!       "conditions": [
//!         {"type": "field", "field": "assignee", "value": "${currentUserId}"}
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! A directory deployment reads every `*.permission.json` file in file name
//! order.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::condition::PermissionCondition;
use crate::error::{AuthzError, Result};
use crate::permission::Permission;
use crate::types::{Action, RoleKey};

/// Suffix of permission files in a deployment directory
pub const PERMISSION_FILE_SUFFIX: &str = ".permission.json";

/// Serialized form of a permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDefinition {
    pub resource_type: String,
    pub action: String,
    pub role_key: RoleKey,
    #[serde(default)]
    pub conditions: Vec<PermissionCondition>,
}

impl PermissionDefinition {
    /// Convert into a permission
    ///
    /// The sentinel action used for container conditions cannot be granted.
    pub fn into_permission(self) -> Result<Permission> {
        if self.resource_type.is_empty() || self.action.is_empty() || self.role_key.is_empty() {
            return Err(AuthzError::Configuration(format!(
                "Permission definition requires resourceType, action and roleKey (got '{}', '{}', '{}')",
                self.resource_type, self.action, self.role_key
            )));
        }

        if self.action == Action::IGNORE {
            return Err(AuthzError::Configuration(format!(
                "Action '{}' on '{}' is reserved",
                Action::IGNORE,
                self.resource_type
            )));
        }

        Ok(Permission::new(self.resource_type, self.action, self.role_key, self.conditions))
    }

    /// Serialized form of a role-owned permission
    ///
    /// Returns `None` for synthetic permissions without a role.
    pub fn from_permission(permission: &Permission) -> Option<Self> {
        let role = permission.role.as_ref()?;

        Some(Self {
            resource_type: permission.resource_type.clone(),
            action: permission.action.key.clone(),
            role_key: role.key.clone(),
            conditions: permission.conditions.clone(),
        })
    }
}

/// A permission configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PermissionDocument {
    #[serde(default)]
    pub permissions: Vec<PermissionDefinition>,
}

impl PermissionDocument {
    /// Parse a document from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a document from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;

        Self::from_json(&json).map_err(|e| {
            AuthzError::Configuration(format!("Invalid permission file '{}': {}", path.display(), e))
        })
    }

    /// Read and merge every permission file in a directory
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;

        files.retain(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| name.ends_with(PERMISSION_FILE_SUFFIX))
        });
        files.sort();

        let mut document = Self::default();
        for file in &files {
            let parsed = Self::from_file(file)?;
            debug!("Read {} permission(s) from {}", parsed.permissions.len(), file.display());
            document.permissions.extend(parsed.permissions);
        }

        info!(
            "Loaded {} permission(s) from {} file(s) in {}",
            document.permissions.len(),
            files.len(),
            dir.display()
        );
        Ok(document)
    }

    /// Convert every definition into a permission
    pub fn into_permissions(self) -> Result<Vec<Permission>> {
        self.permissions
            .into_iter()
            .map(PermissionDefinition::into_permission)
            .collect()
    }

    /// Document holding the role-owned permissions among `permissions`
    pub fn from_permissions<'p>(permissions: impl IntoIterator<Item = &'p Permission>) -> Self {
        Self {
            permissions: permissions
                .into_iter()
                .filter_map(PermissionDefinition::from_permission)
                .collect(),
        }
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
