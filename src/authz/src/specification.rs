//! Authorization specifications
//!
//! A specification answers "may the current actor perform this action on
//! this resource type" for a concrete instance, or produces the filter
//! selecting every stored instance the actor may act on.
//!
//! Permissions are ORed: one applicable permission authorizes the request.
//! A specification without permissions denies everything and filters every
//! row out.

use tracing::debug;

use crate::condition::PermissionCondition;
use crate::context::EvaluationContext;
use crate::error::{AuthzError, Result};
use crate::permission::Permission;
use crate::query::{Predicate, Query, Root};
use crate::resource::Resource;
use crate::types::{Action, ResourceType};

/// Permissions applicable to one (resource type, action) pair
pub struct AuthorizationSpecification<'c> {
    context: &'c EvaluationContext,
    resource_type: ResourceType,
    action: Action,
    permissions: Vec<Permission>,
}

impl<'c> AuthorizationSpecification<'c> {
    /// Create a specification from candidate permissions
    ///
    /// Permissions for another resource type or action are dropped.
    pub fn new(
        context: &'c EvaluationContext,
        resource_type: impl Into<String>,
        action: Action,
        permissions: impl IntoIterator<Item = Permission>,
    ) -> Self {
        let resource_type = resource_type.into();
        let permissions = permissions
            .into_iter()
            .filter(|p| p.resource_type == resource_type && p.action == action)
            .collect();

        Self {
            context,
            resource_type,
            action,
            permissions,
        }
    }

    /// Specification holding `conditions` as a single permission under the
    /// sentinel action
    pub(crate) fn for_conditions(
        context: &'c EvaluationContext,
        resource_type: &str,
        conditions: Vec<PermissionCondition>,
    ) -> Self {
        Self {
            context,
            resource_type: resource_type.to_string(),
            action: Action::ignore(resource_type),
            permissions: vec![Permission::nested(resource_type, conditions)],
        }
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// Whether any permission applies to `entity`
    ///
    /// Without an instance the request is unauthorized.
    pub fn is_authorized(&self, entity: Option<&dyn Resource>) -> Result<bool> {
        let Some(entity) = entity else {
            debug!("Denied {}: no instance supplied", self.action);
            return Ok(false);
        };

        for (idx, permission) in self.permissions.iter().enumerate() {
            if permission.applies_to(&self.resource_type, Some(entity), self.context)? {
                debug!("Granted {} by permission #{}", self.action, idx);
                return Ok(true);
            }
        }

        debug!(
            "Denied {}: none of {} permission(s) applies",
            self.action,
            self.permissions.len()
        );
        Ok(false)
    }

    /// Filter over rows of `root` matching exactly the authorized instances
    pub fn to_predicate(&self, root: &Root, query: &mut Query<'_>) -> Result<Predicate> {
        if root.resource_type() != self.resource_type {
            return Err(AuthzError::InvalidInput(format!(
                "Specification for '{}' cannot filter a '{}' root",
                self.resource_type,
                root.resource_type()
            )));
        }

        let predicates = self
            .permissions
            .iter()
            .map(|permission| permission.to_predicate(root, query, self.context))
            .collect::<Result<Vec<_>>>()?;

        let predicate = Predicate::or(predicates);
        if predicate.is_never() {
            debug!("Filter for {} matches no rows", self.action);
        }

        Ok(predicate)
    }

    /// Allocate the main root in `query` and build its filter
    pub fn to_query_filter(&self, query: &mut Query<'_>) -> Result<(Root, Predicate)> {
        let root = query.root(&self.resource_type)?;
        let predicate = self.to_predicate(&root, query)?;
        Ok((root, predicate))
    }
}
