use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::EvaluationContext;
use crate::document::parse_document;
use crate::error::{AuthzError, Result};
use crate::json_path::JsonPath;
use crate::operator::ComparisonOperator;
use crate::path::FieldPath;
use crate::query::{ColumnRef, Expression, Predicate, Query, Root};
use crate::resolver::Placeholder;
use crate::resource::{PropertyValue, Resource};
use crate::schema::{ResolvedField, ScalarKind, SchemaRegistry};
use crate::types::ConditionValue;

use super::read_property;

/// Comparison on a value selected by a JSON path from a JSON document field
///
/// The selected value only matches a literal of the same kind (number,
/// string or boolean). A missing path, a value of another kind or an invalid
/// payload never matches. Numbers only match within `±2^53`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionCondition {
    /// Field holding the JSON document
    pub field: FieldPath,

    /// JSON path into the document
    pub path: JsonPath,

    /// Comparison operator
    pub operator: ComparisonOperator,

    /// Literal or `${placeholder}`
    pub value: ConditionValue,
}

impl ExpressionCondition {
    pub fn new(field: &str, path: &str, operator: ComparisonOperator, value: impl Into<ConditionValue>) -> Result<Self> {
        Ok(Self {
            field: FieldPath::new(field)?,
            path: JsonPath::parse(path)?,
            operator,
            value: value.into(),
        })
    }

    pub fn is_valid(&self, entity: &dyn Resource, context: &EvaluationContext) -> Result<bool> {
        let expected = context.resolver().resolve(&self.value)?;
        let resolved = document_field(context.schemas(), entity.resource_type(), &self.field)?;

        let payload = match read_property(entity, &self.field, resolved.kind)? {
            PropertyValue::Text(payload) => payload,
            _ => return Ok(false),
        };

        let document = match parse_document(payload) {
            Ok(document) => document,
            Err(e) => {
                debug!("Field '{}' on '{}' is not a valid document: {}", self.field, entity.resource_type(), e);
                return Ok(false);
            }
        };

        if !expected.within_comparable_range() {
            return Ok(false);
        }

        Ok(self
            .path
            .select(&document)
            .and_then(ConditionValue::from_json)
            .filter(ConditionValue::within_comparable_range)
            .is_some_and(|actual| self.operator.evaluate_values(&actual, &expected)))
    }

    pub fn to_predicate(&self, root: &Root, query: &mut Query<'_>, context: &EvaluationContext) -> Result<Predicate> {
        let expected = context.resolver().resolve(&self.value)?;
        let resolved = document_field(query.schemas(), root.resource_type(), &self.field)?;

        if !expected.within_comparable_range() {
            return Ok(Predicate::Constant(false));
        }

        let expression = Expression::JsonValue {
            column: ColumnRef::new(root.alias(), resolved.column),
            path: self.path.clone(),
        };

        Ok(self.operator.to_predicate(expression, expected))
    }

    pub fn validate(&self, resource_type: &str, schemas: &SchemaRegistry) -> Result<()> {
        Placeholder::detect(&self.value)?;
        document_field(schemas, resource_type, &self.field).map(|_| ())
    }
}

/// Resolve a field that must hold a JSON document
fn document_field(schemas: &SchemaRegistry, resource_type: &str, field: &FieldPath) -> Result<ResolvedField> {
    let resolved = schemas.resolve(resource_type, field)?;

    match resolved.kind {
        ScalarKind::Json => Ok(resolved),
        other => Err(AuthzError::Configuration(format!(
            "Expression condition on '{}.{}' requires a JSON document field, found {:?}",
            resource_type, field, other
        ))),
    }
}
