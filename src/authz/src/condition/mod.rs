//! Permission conditions
//!
//! A condition is the smallest unit of authorization logic. Every condition
//! can be evaluated two ways:
//!
//! - [`is_valid`](PermissionCondition::is_valid) against a loaded instance;
//! - [`to_predicate`](PermissionCondition::to_predicate) as a filter over
//!   stored rows.
//!
//! Both must agree for every instance/row pair. Misconfigured conditions
//! (unknown fields, missing mappers, unknown placeholders) fail with an error
//! in both modes and are never reported as a plain denial.
//!
//! # Configuration format
//!
//! ```json
//! {"type": "field", "field": "child.property", "value": "true"}
//! {"type": "expression", "field": "data", "path": "$.amount", "operator": ">=", "value": 100}
//! {"type": "container", "resourceType": "note", "conditions": [ ... ]}
//! ```

mod container;
mod expression;
mod field;

pub use container::ContainerCondition;
pub use expression::ExpressionCondition;
pub use field::FieldCondition;

use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::{AuthzError, Result};
use crate::mapper::EntityMapperRegistry;
use crate::path::FieldPath;
use crate::query::{Predicate, Query, Root};
use crate::resource::{lookup, PropertyValue, Resource};
use crate::schema::{ScalarKind, SchemaRegistry};

/// Condition attached to a permission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PermissionCondition {
    Field(FieldCondition),
    Expression(ExpressionCondition),
    Container(ContainerCondition),
}

impl PermissionCondition {
    /// Evaluate against a loaded instance
    pub fn is_valid(&self, entity: &dyn Resource, context: &EvaluationContext) -> Result<bool> {
        match self {
            Self::Field(condition) => condition.is_valid(entity, context),
            Self::Expression(condition) => condition.is_valid(entity, context),
            Self::Container(condition) => condition.is_valid(entity, context),
        }
    }

    /// Build the equivalent filter over rows of `root`
    pub fn to_predicate(&self, root: &Root, query: &mut Query<'_>, context: &EvaluationContext) -> Result<Predicate> {
        match self {
            Self::Field(condition) => condition.to_predicate(root, query),
            Self::Expression(condition) => condition.to_predicate(root, query, context),
            Self::Container(condition) => condition.to_predicate(root, query, context),
        }
    }

    /// Check the condition against schemas and mappers without an instance
    pub fn validate(&self, resource_type: &str, schemas: &SchemaRegistry, mappers: &EntityMapperRegistry) -> Result<()> {
        match self {
            Self::Field(condition) => condition.validate(resource_type, schemas),
            Self::Expression(condition) => condition.validate(resource_type, schemas),
            Self::Container(condition) => condition.validate(resource_type, schemas, mappers),
        }
    }
}

impl From<FieldCondition> for PermissionCondition {
    fn from(condition: FieldCondition) -> Self {
        Self::Field(condition)
    }
}

impl From<ExpressionCondition> for PermissionCondition {
    fn from(condition: ExpressionCondition) -> Self {
        Self::Expression(condition)
    }
}

impl From<ContainerCondition> for PermissionCondition {
    fn from(condition: ContainerCondition) -> Self {
        Self::Container(condition)
    }
}

/// Read a schema-declared property from an instance
///
/// The instance must expose every property its schema declares, with a value
/// of the declared kind.
fn read_property<'a>(entity: &'a dyn Resource, path: &FieldPath, kind: ScalarKind) -> Result<PropertyValue<'a>> {
    let value = lookup(entity, path)
        .ok_or_else(|| AuthzError::field_not_found(entity.resource_type(), path.as_str()))?;

    if !kind.accepts(&value) {
        return Err(AuthzError::Configuration(format!(
            "Field '{}' on '{}' is declared as {:?} but the instance holds a {} value",
            path,
            entity.resource_type(),
            kind,
            value.kind()
        )));
    }

    Ok(value)
}
