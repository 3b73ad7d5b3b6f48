use serde::{Deserialize, Serialize};

use crate::context::EvaluationContext;
use crate::error::Result;
use crate::operator::ComparisonOperator;
use crate::path::FieldPath;
use crate::query::{Predicate, Query, Root};
use crate::resource::Resource;
use crate::schema::SchemaRegistry;

use super::read_property;

/// Exact string equality on a dotted property path
///
/// The property value is compared in its canonical string form
/// (`42`, `true`, lowercase hyphenated UUIDs). A `null` value never matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCondition {
    /// Dotted property path
    pub field: FieldPath,

    /// Expected value
    pub value: String,
}

impl FieldCondition {
    pub fn new(field: &str, value: impl Into<String>) -> Result<Self> {
        Ok(Self {
            field: FieldPath::new(field)?,
            value: value.into(),
        })
    }

    pub fn is_valid(&self, entity: &dyn Resource, context: &EvaluationContext) -> Result<bool> {
        let resolved = context.schemas().resolve(entity.resource_type(), &self.field)?;
        let value = read_property(entity, &self.field, resolved.kind)?;

        Ok(value.to_text().is_some_and(|text| text == self.value))
    }

    /// Compares the column with the literal converted to the column's type.
    /// A literal no stored value can stringify to matches nothing.
    pub fn to_predicate(&self, root: &Root, query: &mut Query<'_>) -> Result<Predicate> {
        let resolved = query.resolve(root, &self.field)?;

        match resolved.kind.parse_literal(&self.value) {
            Some(literal) => Ok(ComparisonOperator::EqualTo.to_predicate(query.get(root, &self.field)?, literal)),
            None => Ok(Predicate::Constant(false)),
        }
    }

    pub fn validate(&self, resource_type: &str, schemas: &SchemaRegistry) -> Result<()> {
        schemas.resolve(resource_type, &self.field).map(|_| ())
    }
}
