use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::{AuthzError, Result};
use crate::mapper::EntityMapperRegistry;
use crate::query::{Predicate, Query, Root};
use crate::resource::Resource;
use crate::schema::SchemaRegistry;
use crate::specification::AuthorizationSpecification;

use super::PermissionCondition;

/// Holds when at least one related instance satisfies all nested conditions
///
/// Related instances are found through the entity mapper registered for the
/// (owner type, `resource_type`) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerCondition {
    /// Resource type of the related instances
    pub resource_type: String,

    /// Conditions evaluated against each related instance
    #[serde(default)]
    pub conditions: Vec<PermissionCondition>,
}

impl ContainerCondition {
    pub fn new(resource_type: impl Into<String>, conditions: Vec<PermissionCondition>) -> Self {
        Self {
            resource_type: resource_type.into(),
            conditions,
        }
    }

    fn specification<'c>(&self, context: &'c EvaluationContext) -> AuthorizationSpecification<'c> {
        AuthorizationSpecification::for_conditions(context, &self.resource_type, self.conditions.clone())
    }

    pub fn is_valid(&self, entity: &dyn Resource, context: &EvaluationContext) -> Result<bool> {
        let mapper = context.mappers().find(entity.resource_type(), &self.resource_type)?;
        let related = mapper.map_related(entity)?;
        let specification = self.specification(context);

        for instance in &related {
            if specification.is_authorized(Some(instance.as_ref()))? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Correlated `EXISTS` over the joined root, so the container stays a
    /// row-level filter of the owner when permissions are ORed.
    pub fn to_predicate(&self, root: &Root, query: &mut Query<'_>, context: &EvaluationContext) -> Result<Predicate> {
        let mapper = context.mappers().find(root.resource_type(), &self.resource_type)?;
        let (joined, join) = mapper.map_query(root, query)?;

        if joined.resource_type() != self.resource_type {
            return Err(AuthzError::Configuration(format!(
                "Entity mapper '{} -> {}' joined a '{}' root",
                root.resource_type(),
                self.resource_type,
                joined.resource_type()
            )));
        }

        let nested = self.specification(context).to_predicate(&joined, query)?;
        Ok(Predicate::exists(joined, Predicate::and([join, nested])))
    }

    pub fn validate(&self, resource_type: &str, schemas: &SchemaRegistry, mappers: &EntityMapperRegistry) -> Result<()> {
        mappers.find(resource_type, &self.resource_type)?;
        schemas.get(&self.resource_type)?;

        for condition in &self.conditions {
            condition.validate(&self.resource_type, schemas, mappers)?;
        }

        Ok(())
    }
}
