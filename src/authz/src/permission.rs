//! Permissions granted to roles

use crate::condition::PermissionCondition;
use crate::context::EvaluationContext;
use crate::error::{AuthzError, Result};
use crate::mapper::EntityMapperRegistry;
use crate::query::{Predicate, Query, Root};
use crate::resource::Resource;
use crate::schema::SchemaRegistry;
use crate::types::{Action, ResourceType, Role};

/// Grant of an action on a resource type, restricted by conditions
///
/// All conditions must hold. A permission without conditions applies to
/// every instance of its resource type.
#[derive(Debug, Clone, PartialEq)]
pub struct Permission {
    /// Resource type the permission applies to
    pub resource_type: ResourceType,

    /// Granted action
    pub action: Action,

    /// Role the permission is granted to; `None` for the synthetic
    /// permission used by container conditions
    pub role: Option<Role>,

    /// Conditions, all of which must hold
    pub conditions: Vec<PermissionCondition>,
}

impl Permission {
    /// Create a permission granted to a role
    pub fn new(
        resource_type: impl Into<String>,
        action: impl Into<String>,
        role: impl Into<String>,
        conditions: Vec<PermissionCondition>,
    ) -> Self {
        let resource_type = resource_type.into();
        Self {
            action: Action::new(resource_type.clone(), action),
            resource_type,
            role: Some(Role::new(role)),
            conditions,
        }
    }

    /// Permission under the sentinel action, used to evaluate nested
    /// container conditions against a related type
    pub(crate) fn nested(resource_type: impl Into<String>, conditions: Vec<PermissionCondition>) -> Self {
        let resource_type = resource_type.into();
        Self {
            action: Action::ignore(resource_type.clone()),
            resource_type,
            role: None,
            conditions,
        }
    }

    /// Whether the permission is granted to `role`
    pub fn is_granted_to(&self, role: &str) -> bool {
        self.role.as_ref().is_some_and(|r| r.key == role)
    }

    /// Whether the permission applies to an instance of `resource_type`
    ///
    /// The resource type must match exactly; subtypes are not considered.
    /// Without an instance the permission never applies.
    pub fn applies_to(
        &self,
        resource_type: &str,
        entity: Option<&dyn Resource>,
        context: &EvaluationContext,
    ) -> Result<bool> {
        let Some(entity) = entity else {
            return Ok(false);
        };

        if self.resource_type != resource_type {
            return Ok(false);
        }

        for condition in &self.conditions {
            if !condition.is_valid(entity, context)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Conjunction of all condition predicates over `root`
    pub fn to_predicate(&self, root: &Root, query: &mut Query<'_>, context: &EvaluationContext) -> Result<Predicate> {
        if self.resource_type != root.resource_type() {
            return Ok(Predicate::Constant(false));
        }

        let predicates = self
            .conditions
            .iter()
            .map(|condition| condition.to_predicate(root, query, context))
            .collect::<Result<Vec<_>>>()?;

        Ok(Predicate::and(predicates))
    }

    /// Check every condition against schemas and mappers
    pub fn validate(&self, schemas: &SchemaRegistry, mappers: &EntityMapperRegistry) -> Result<()> {
        if self.action.resource_type != self.resource_type {
            return Err(AuthzError::Configuration(format!(
                "Permission for '{}' grants action '{}' of another resource type",
                self.resource_type, self.action
            )));
        }

        if self.role.is_some() && self.action.is_ignore() {
            return Err(AuthzError::Configuration(format!(
                "Action '{}' is reserved and cannot be granted",
                Action::IGNORE
            )));
        }

        schemas.get(&self.resource_type)?;

        for condition in &self.conditions {
            condition.validate(&self.resource_type, schemas, mappers)?;
        }

        Ok(())
    }
}
