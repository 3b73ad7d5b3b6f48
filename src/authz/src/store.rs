//! Permission storage

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::error::Result;
use crate::permission::Permission;
use crate::types::{Action, RoleKey};

/// Permission store trait
pub trait PermissionStore: Send + Sync {
    /// Add a permission
    fn add(&self, permission: Permission) -> Result<()>;

    /// Replace every stored permission
    fn replace_all(&self, permissions: Vec<Permission>) -> Result<()>;

    /// List all permissions
    fn list(&self) -> Result<Vec<Permission>>;

    /// Permissions for an action granted to any of `roles`
    fn find(&self, action: &Action, roles: &[RoleKey]) -> Result<Vec<Permission>>;
}

type PermissionIndex = HashMap<Action, Vec<Permission>>;

/// In-memory permission store
///
/// Readers work on an immutable snapshot; writers swap in a new one, so a
/// reload never exposes a partially replaced permission set.
pub struct InMemoryPermissionStore {
    snapshot: RwLock<Arc<PermissionIndex>>,
}

impl InMemoryPermissionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(HashMap::new())),
        }
    }

    /// Create a store holding `permissions`
    pub fn with_permissions(permissions: Vec<Permission>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(index(permissions))),
        }
    }

    fn current(&self) -> Arc<PermissionIndex> {
        Arc::clone(&self.snapshot.read())
    }
}

impl Default for InMemoryPermissionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PermissionStore for InMemoryPermissionStore {
    fn add(&self, permission: Permission) -> Result<()> {
        let mut snapshot = self.snapshot.write();
        let mut next = PermissionIndex::clone(&snapshot);
        next.entry(permission.action.clone()).or_default().push(permission);
        *snapshot = Arc::new(next);
        Ok(())
    }

    fn replace_all(&self, permissions: Vec<Permission>) -> Result<()> {
        let count = permissions.len();
        let next = Arc::new(index(permissions));
        *self.snapshot.write() = next;

        info!("Replaced permission set ({} permissions)", count);
        Ok(())
    }

    fn list(&self) -> Result<Vec<Permission>> {
        Ok(self.current().values().flatten().cloned().collect())
    }

    fn find(&self, action: &Action, roles: &[RoleKey]) -> Result<Vec<Permission>> {
        let snapshot = self.current();

        Ok(snapshot
            .get(action)
            .map(|permissions| {
                permissions
                    .iter()
                    .filter(|p| roles.iter().any(|role| p.is_granted_to(role)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

fn index(permissions: Vec<Permission>) -> PermissionIndex {
    let mut index = PermissionIndex::new();
    for permission in permissions {
        index.entry(permission.action.clone()).or_default().push(permission);
    }
    index
}
