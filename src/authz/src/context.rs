//! Evaluation context shared by conditions, permissions and specifications

use std::sync::Arc;

use crate::mapper::EntityMapperRegistry;
use crate::resolver::{ActorContext, ValueResolver};
use crate::schema::SchemaRegistry;

/// Collaborators needed to evaluate conditions
///
/// Schemas and mappers are read-only reference data shared between requests;
/// the actor is specific to one request.
#[derive(Clone)]
pub struct EvaluationContext {
    schemas: Arc<SchemaRegistry>,
    mappers: Arc<EntityMapperRegistry>,
    actor: Arc<dyn ActorContext>,
}

impl EvaluationContext {
    pub fn new(
        schemas: Arc<SchemaRegistry>,
        mappers: Arc<EntityMapperRegistry>,
        actor: Arc<dyn ActorContext>,
    ) -> Self {
        Self {
            schemas,
            mappers,
            actor,
        }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn mappers(&self) -> &EntityMapperRegistry {
        &self.mappers
    }

    pub fn actor(&self) -> &dyn ActorContext {
        self.actor.as_ref()
    }

    /// Placeholder resolver bound to the current actor
    pub fn resolver(&self) -> ValueResolver<'_> {
        ValueResolver::new(self.actor.as_ref())
    }
}
