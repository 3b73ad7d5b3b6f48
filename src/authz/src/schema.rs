//! Resource schemas and field path resolution
//!
//! A schema declares, per resource type, the table that stores it and the
//! properties conditions may reference. Embedded properties share the
//! owner's row; their columns default to `<parent column>_<child column>`.
//!
//! Resolved paths are cached per (resource type, path), so a path is walked
//! through the schema once and then reused by both evaluation modes.

use dashmap::DashMap;
use std::collections::HashMap;

use crate::error::{AuthzError, Result};
use crate::path::FieldPath;
use crate::resource::PropertyValue;
use crate::types::ConditionValue;

/// Storage kind of a scalar property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Text,
    Integer,
    Float,
    Boolean,
    Uuid,
    /// Text column holding a serialized JSON document
    Json,
}

impl ScalarKind {
    /// Whether an instance value is compatible with this kind
    pub fn accepts(&self, value: &PropertyValue<'_>) -> bool {
        matches!(
            (self, value),
            (_, PropertyValue::Null)
                | (Self::Text, PropertyValue::Text(_))
                | (Self::Json, PropertyValue::Text(_))
                | (Self::Integer, PropertyValue::Integer(_))
                | (Self::Float, PropertyValue::Float(_))
                | (Self::Boolean, PropertyValue::Boolean(_))
                | (Self::Uuid, PropertyValue::Uuid(_))
        )
    }

    /// Convert a field condition literal into a typed column value
    ///
    /// Returns `None` when no stored value of this kind stringifies to
    /// `literal`, e.g. `"042"` for an integer column.
    pub fn parse_literal(&self, literal: &str) -> Option<ConditionValue> {
        match self {
            Self::Text | Self::Json => Some(ConditionValue::String(literal.to_string())),
            Self::Integer => literal
                .parse::<i64>()
                .ok()
                .filter(|n| n.to_string() == literal)
                .map(ConditionValue::Integer),
            // Stored zeros of either sign stringify to "0"
            Self::Float => literal
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite() && PropertyValue::Float(*f).to_text().as_deref() == Some(literal))
                .map(ConditionValue::Float),
            Self::Boolean => match literal {
                "true" => Some(ConditionValue::Boolean(true)),
                "false" => Some(ConditionValue::Boolean(false)),
                _ => None,
            },
            Self::Uuid => uuid::Uuid::parse_str(literal)
                .ok()
                .filter(|u| u.to_string() == literal)
                .map(|u| ConditionValue::String(u.to_string())),
        }
    }
}

/// Kind of a declared property
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyKind {
    Scalar(ScalarKind),
    Embedded(Vec<PropertySchema>),
}

/// Declared property of a resource or embedded object
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySchema {
    /// Property name used in field paths
    pub name: String,

    /// Column name (prefix for embedded objects)
    pub column: String,

    /// Property kind
    pub kind: PropertyKind,
}

impl PropertySchema {
    /// Scalar property stored in a column of the same name
    pub fn scalar(name: impl Into<String>, kind: ScalarKind) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            kind: PropertyKind::Scalar(kind),
        }
    }

    /// Embedded object whose properties share the owner's row
    pub fn embedded(name: impl Into<String>, properties: Vec<PropertySchema>) -> Self {
        let name = name.into();
        Self {
            column: name.clone(),
            name,
            kind: PropertyKind::Embedded(properties),
        }
    }

    /// Override the column name
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }
}

/// Result of resolving a field path against a schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    /// Column holding the value
    pub column: String,

    /// Storage kind of the value
    pub kind: ScalarKind,
}

/// Schema of one resource type
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    /// Resource type key
    pub resource_type: String,

    /// Table the resource is stored in
    pub table: String,

    /// Primary key column
    pub id_column: String,

    /// Declared properties
    pub properties: Vec<PropertySchema>,
}

impl ResourceSchema {
    /// Create a schema with an `id` primary key column
    pub fn new(resource_type: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            table: table.into(),
            id_column: "id".to_string(),
            properties: Vec::new(),
        }
    }

    /// Override the primary key column
    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Declare a property
    pub fn with_property(mut self, property: PropertySchema) -> Self {
        self.properties.push(property);
        self
    }

    /// Resolve a dotted path to its column and kind
    pub fn resolve(&self, path: &FieldPath) -> Result<ResolvedField> {
        let not_found = || AuthzError::field_not_found(&self.resource_type, path.as_str());

        let mut properties = &self.properties;
        let mut column = String::new();
        let segments = path.segments();

        for (idx, segment) in segments.iter().enumerate() {
            let property = properties
                .iter()
                .find(|p| &p.name == segment)
                .ok_or_else(not_found)?;

            if !column.is_empty() {
                column.push('_');
            }
            column.push_str(&property.column);

            match (&property.kind, idx + 1 == segments.len()) {
                (PropertyKind::Scalar(kind), true) => {
                    return Ok(ResolvedField { column, kind: *kind });
                }
                (PropertyKind::Embedded(children), false) => properties = children,
                (PropertyKind::Scalar(_), false) => return Err(not_found()),
                (PropertyKind::Embedded(_), true) => {
                    return Err(AuthzError::Configuration(format!(
                        "Field '{}' on '{}' is an embedded object, not a value",
                        path, self.resource_type
                    )));
                }
            }
        }

        Err(not_found())
    }
}

/// Registry of resource schemas with cached path resolution
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, ResourceSchema>,
    resolved: DashMap<(String, String), ResolvedField>,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any previous schema for the same type
    pub fn register(&mut self, schema: ResourceSchema) {
        self.resolved.retain(|(resource_type, _), _| resource_type != &schema.resource_type);
        self.schemas.insert(schema.resource_type.clone(), schema);
    }

    /// Builder-style registration
    pub fn with_schema(mut self, schema: ResourceSchema) -> Self {
        self.register(schema);
        self
    }

    /// Schema of a resource type
    pub fn get(&self, resource_type: &str) -> Result<&ResourceSchema> {
        self.schemas
            .get(resource_type)
            .ok_or_else(|| AuthzError::UnknownResourceType(resource_type.to_string()))
    }

    /// Resolve a path on a resource type (cached)
    pub fn resolve(&self, resource_type: &str, path: &FieldPath) -> Result<ResolvedField> {
        let key = (resource_type.to_string(), path.as_str().to_string());

        if let Some(resolved) = self.resolved.get(&key) {
            return Ok(resolved.clone());
        }

        let resolved = self.get(resource_type)?.resolve(path)?;
        self.resolved.insert(key, resolved.clone());

        Ok(resolved)
    }

    /// Number of cached path resolutions
    pub fn cached_paths(&self) -> usize {
        self.resolved.len()
    }
}
