//! Entity mappers for container conditions
//!
//! A mapper relates instances of one resource type to instances of another,
//! both in memory (`map_related`) and in a query (`map_query`, which joins a
//! new root and returns the join predicate).

use std::fmt;

use crate::error::{AuthzError, Result};
use crate::query::{Predicate, Query, Root};
use crate::resource::{Resource, TypedResource};

/// Typed relation between two resource types
pub trait EntityMapper: Send + Sync + 'static {
    type From: TypedResource;
    type To: TypedResource;

    /// Related instances of `entity`
    fn map_related(&self, entity: &Self::From) -> Vec<Self::To>;

    /// Join a root of `Self::To` related to `root`
    ///
    /// Returns the joined root and the predicate linking it to `root`.
    fn map_query(&self, root: &Root, query: &mut Query<'_>) -> Result<(Root, Predicate)>;
}

/// Type-erased entity mapper
pub trait DynEntityMapper: Send + Sync {
    fn from_type(&self) -> &'static str;

    fn to_type(&self) -> &'static str;

    fn map_related(&self, entity: &dyn Resource) -> Result<Vec<Box<dyn Resource>>>;

    fn map_query(&self, root: &Root, query: &mut Query<'_>) -> Result<(Root, Predicate)>;
}

struct Erased<M>(M);

impl<M: EntityMapper> DynEntityMapper for Erased<M> {
    fn from_type(&self) -> &'static str {
        M::From::RESOURCE_TYPE
    }

    fn to_type(&self) -> &'static str {
        M::To::RESOURCE_TYPE
    }

    fn map_related(&self, entity: &dyn Resource) -> Result<Vec<Box<dyn Resource>>> {
        let typed = entity.as_any().downcast_ref::<M::From>().ok_or_else(|| {
            AuthzError::Configuration(format!(
                "Entity mapper for '{}' received an instance of '{}'",
                M::From::RESOURCE_TYPE,
                entity.resource_type()
            ))
        })?;

        Ok(self
            .0
            .map_related(typed)
            .into_iter()
            .map(|related| Box::new(related) as Box<dyn Resource>)
            .collect())
    }

    fn map_query(&self, root: &Root, query: &mut Query<'_>) -> Result<(Root, Predicate)> {
        self.0.map_query(root, query)
    }
}

/// Registry of entity mappers indexed by (from, to) resource types
#[derive(Default)]
pub struct EntityMapperRegistry {
    mappers: Vec<Box<dyn DynEntityMapper>>,
}

impl EntityMapperRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a mapper
    ///
    /// Registering two mappers for the same pair makes lookups for that pair
    /// fail as ambiguous.
    pub fn register<M: EntityMapper>(&mut self, mapper: M) {
        self.mappers.push(Box::new(Erased(mapper)));
    }

    /// Builder-style registration
    pub fn with_mapper<M: EntityMapper>(mut self, mapper: M) -> Self {
        self.register(mapper);
        self
    }

    /// Find the single mapper for a (from, to) pair
    pub fn find(&self, from: &str, to: &str) -> Result<&dyn DynEntityMapper> {
        let mut matching = self
            .mappers
            .iter()
            .filter(|m| m.from_type() == from && m.to_type() == to);

        match (matching.next(), matching.next()) {
            (Some(mapper), None) => Ok(mapper.as_ref()),
            (None, _) => Err(AuthzError::MapperNotFound {
                from: from.to_string(),
                to: to.to_string(),
            }),
            (Some(_), Some(_)) => Err(AuthzError::AmbiguousMapper {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl fmt::Debug for EntityMapperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.mappers.iter().map(|m| format!("{} -> {}", m.from_type(), m.to_type())))
            .finish()
    }
}
