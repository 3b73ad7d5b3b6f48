//! Authorization service
//!
//! In-process entry point tying the permission store, schemas and mappers
//! together:
//!
//! ```text
//! Request + Actor → PermissionStore (action, roles) → Specification
//!                                                      ├─ is_authorized(instance)
//!                                                      └─ to_query_filter(query) → SqlRenderer
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PermissionDocument;
use crate::context::EvaluationContext;
use crate::error::{AuthzError, Result};
use crate::mapper::EntityMapperRegistry;
use crate::permission::Permission;
use crate::query::{Predicate, Query, Root, SqlDialect, SqlFragment, SqlRenderer};
use crate::resource::Resource;
use crate::schema::SchemaRegistry;
use crate::specification::AuthorizationSpecification;
use crate::store::PermissionStore;
use crate::types::{Actor, AuthorizationRequest};

/// Authorization engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// SQL dialect used to render query filters
    pub dialect: SqlDialect,

    /// Validate permissions against schemas and mappers before deploying
    pub validate_on_deploy: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dialect: SqlDialect::Postgres,
            validate_on_deploy: true,
        }
    }
}

/// Authorization service
pub struct AuthorizationService {
    schemas: Arc<SchemaRegistry>,
    mappers: Arc<EntityMapperRegistry>,
    store: Arc<dyn PermissionStore>,
    config: EngineConfig,
}

impl AuthorizationService {
    pub fn new(
        config: EngineConfig,
        schemas: Arc<SchemaRegistry>,
        mappers: Arc<EntityMapperRegistry>,
        store: Arc<dyn PermissionStore>,
    ) -> Self {
        info!(
            "AuthorizationService initialized with dialect={:?}, validate_on_deploy={}, mappers={}",
            config.dialect,
            config.validate_on_deploy,
            mappers.len()
        );

        Self {
            schemas,
            mappers,
            store,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    /// Evaluation context for one actor
    pub fn context(&self, actor: &Actor) -> EvaluationContext {
        EvaluationContext::new(
            Arc::clone(&self.schemas),
            Arc::clone(&self.mappers),
            Arc::new(actor.clone()),
        )
    }

    /// Empty query over the registered schemas
    pub fn query(&self) -> Query<'_> {
        Query::new(&self.schemas)
    }

    /// Renderer for the configured dialect
    pub fn renderer(&self) -> SqlRenderer {
        SqlRenderer::new(self.config.dialect)
    }

    /// Specification of the permissions granted to `actor` for `request`
    pub fn specification<'c>(
        &self,
        context: &'c EvaluationContext,
        actor: &Actor,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationSpecification<'c>> {
        if request.action.resource_type != request.resource_type {
            return Err(AuthzError::InvalidInput(format!(
                "Action '{}' is not declared for resource type '{}'",
                request.action, request.resource_type
            )));
        }

        let permissions = self.store.find(&request.action, &actor.roles)?;
        debug!(
            "Found {} permission(s) for {} and roles {:?}",
            permissions.len(),
            request.action,
            actor.roles
        );

        Ok(AuthorizationSpecification::new(
            context,
            request.resource_type.clone(),
            request.action.clone(),
            permissions,
        ))
    }

    /// Whether `actor` may perform `request` on `entity`
    pub fn has_permission(
        &self,
        actor: &Actor,
        request: &AuthorizationRequest,
        entity: Option<&dyn Resource>,
    ) -> Result<bool> {
        let context = self.context(actor);
        let allowed = self.specification(&context, actor, request)?.is_authorized(entity)?;

        debug!("Decision for actor '{}' on {}: {}", actor.id, request.action, allowed);
        Ok(allowed)
    }

    /// Like [`has_permission`](Self::has_permission), failing with
    /// [`AuthzError::AccessDenied`] when the request is denied
    pub fn require_permission(
        &self,
        actor: &Actor,
        request: &AuthorizationRequest,
        entity: Option<&dyn Resource>,
    ) -> Result<()> {
        if self.has_permission(actor, request, entity)? {
            Ok(())
        } else {
            Err(AuthzError::AccessDenied {
                resource_type: request.resource_type.clone(),
                action: request.action.key.clone(),
            })
        }
    }

    /// Root and filter selecting every instance `actor` may act on
    pub fn query_filter(
        &self,
        actor: &Actor,
        request: &AuthorizationRequest,
        query: &mut Query<'_>,
    ) -> Result<(Root, Predicate)> {
        let context = self.context(actor);
        self.specification(&context, actor, request)?.to_query_filter(query)
    }

    /// `SELECT` of every instance `actor` may act on, in the configured dialect
    pub fn filtered_select(&self, actor: &Actor, request: &AuthorizationRequest) -> Result<SqlFragment> {
        let mut query = self.query();
        let (root, predicate) = self.query_filter(actor, request, &mut query)?;
        Ok(self.renderer().select(&root, &predicate))
    }

    /// Check permissions against schemas and mappers
    pub fn validate(&self, permissions: &[Permission]) -> Result<()> {
        for permission in permissions {
            permission.validate(&self.schemas, &self.mappers)?;
        }
        Ok(())
    }

    /// Replace the deployed permission set
    ///
    /// Nothing is replaced when any permission fails validation.
    pub fn deploy(&self, document: PermissionDocument) -> Result<usize> {
        let permissions = document.into_permissions()?;

        if self.config.validate_on_deploy {
            self.validate(&permissions)?;
        }

        let count = permissions.len();
        self.store.replace_all(permissions)?;

        info!("Deployed {} permission(s)", count);
        Ok(count)
    }

    /// Deploy every permission file in a directory
    pub fn deploy_dir(&self, dir: impl AsRef<Path>) -> Result<usize> {
        self.deploy(PermissionDocument::from_dir(dir)?)
    }
}
