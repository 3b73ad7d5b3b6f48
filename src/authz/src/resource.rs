//! Resource instances as seen by the engine
//!
//! Domain types expose their properties by name through [`Properties`];
//! the [`SchemaRegistry`](crate::schema::SchemaRegistry) declares which names
//! exist, so conditions are validated against the schema while values come
//! from the instance.

use std::any::Any;
use std::borrow::Cow;

use uuid::Uuid;

use crate::path::FieldPath;

/// Property value returned by a resource
#[derive(Clone, Copy)]
pub enum PropertyValue<'a> {
    Null,
    Text(&'a str),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Uuid(Uuid),
    /// Embedded object stored alongside its owner
    Embedded(&'a dyn Properties),
}

impl<'a> PropertyValue<'a> {
    /// Canonical string form used by field conditions
    ///
    /// `Null`, embedded objects and non-finite floats have no string form.
    /// Negative zero is written as `0`.
    pub fn to_text(&self) -> Option<Cow<'a, str>> {
        match self {
            Self::Null | Self::Embedded(_) => None,
            Self::Text(s) => Some(Cow::Borrowed(*s)),
            Self::Integer(i) => Some(Cow::Owned(i.to_string())),
            Self::Float(f) if !f.is_finite() => None,
            Self::Float(f) if *f == 0.0 => Some(Cow::Borrowed("0")),
            Self::Float(f) => Some(Cow::Owned(f.to_string())),
            Self::Boolean(b) => Some(Cow::Owned(b.to_string())),
            Self::Uuid(u) => Some(Cow::Owned(u.to_string())),
        }
    }

    /// Kind name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Text(_) => "text",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Uuid(_) => "uuid",
            Self::Embedded(_) => "embedded",
        }
    }
}

impl std::fmt::Debug for PropertyValue<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Embedded(_) => write!(f, "Embedded(..)"),
            other => write!(f, "{}({:?})", other.kind(), other.to_text()),
        }
    }
}

/// Named property access
pub trait Properties {
    /// Value of the named property, or `None` if the property does not exist
    fn property(&self, name: &str) -> Option<PropertyValue<'_>>;
}

/// Downcasting support for type-erased resources
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A resource instance that permissions can be evaluated against
pub trait Resource: Properties + AsAny + Send + Sync {
    /// Runtime resource type of this instance
    fn resource_type(&self) -> &'static str;
}

/// Resource with a statically known type, used by typed entity mappers
pub trait TypedResource: Resource + Sized + 'static {
    const RESOURCE_TYPE: &'static str;
}

/// Walk a dotted path from a resource
///
/// Returns `None` when a segment does not exist on the instance. A `Null`
/// embedded object yields `Null` for everything below it.
pub fn lookup<'a>(resource: &'a dyn Resource, path: &FieldPath) -> Option<PropertyValue<'a>> {
    let (first, rest) = path.segments().split_first()?;
    let mut value = resource.property(first)?;

    for segment in rest {
        value = match value {
            PropertyValue::Embedded(inner) => inner.property(segment)?,
            PropertyValue::Null => return Some(PropertyValue::Null),
            _ => return None,
        };
    }

    Some(value)
}
