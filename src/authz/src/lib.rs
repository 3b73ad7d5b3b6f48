//! # Caseflow Authorization Engine
//!
//! Role-based permission evaluation with instance conditions.
//!
//! ## Features
//!
//! - **Permissions** granted to roles for an action on a resource type
//! - **Conditions** on instance fields, on values inside JSON documents and
//!   on related instances (container conditions)
//! - **Two evaluation modes** that agree: in memory against a loaded
//!   instance, or as a query filter rendered to SQL (PostgreSQL, SQLite)
//! - **Actor placeholders** (`${currentUserId}`, `${currentUserEmail}`)
//! - **Fail-closed**: without an applicable permission nothing is authorized
//!   and the query filter matches no rows
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use caseflow_authz::{
//!     Actor, AuthorizationRequest, AuthorizationService, EngineConfig, EntityMapperRegistry,
//!     InMemoryPermissionStore, PermissionDocument, Properties, PropertySchema, PropertyValue,
//!     Resource, ResourceSchema, ScalarKind, SchemaRegistry,
//! };
//!
//! struct Document {
//!     status: String,
//! }
//!
//! impl Properties for Document {
//!     fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
//!         match name {
//!             "status" => Some(PropertyValue::Text(&self.status)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! impl Resource for Document {
//!     fn resource_type(&self) -> &'static str {
//!         "document"
//!     }
//! }
//!
//! fn main() -> caseflow_authz::Result<()> {
//!     let schemas = SchemaRegistry::new().with_schema(
//!         ResourceSchema::new("document", "documents")
//!             .with_property(PropertySchema::scalar("status", ScalarKind::Text)),
//!     );
//!
//!     let service = AuthorizationService::new(
//!         EngineConfig::default(),
//!         Arc::new(schemas),
//!         Arc::new(EntityMapperRegistry::new()),
//!         Arc::new(InMemoryPermissionStore::new()),
//!     );
//!
//!     service.deploy(PermissionDocument::from_json(
//!         r#"{"permissions": [{
//!             "resourceType": "document", "action": "view", "roleKey": "ROLE_USER",
//!             "conditions": [{"type": "field", "field": "status", "value": "open"}]
//!         }]}"#,
//!     )?)?;
//!
//!     let actor = Actor::new("user-1", "alice@example.com").with_role("ROLE_USER");
//!     let request = AuthorizationRequest::new("document", "view");
//!
//!     let open = Document { status: "open".to_string() };
//!     let closed = Document { status: "closed".to_string() };
//!
//!     assert!(service.has_permission(&actor, &request, Some(&open))?);
//!     assert!(!service.has_permission(&actor, &request, Some(&closed))?);
//!
//!     Ok(())
//! }
//! ```

pub mod condition;
pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod json_path;
pub mod mapper;
pub mod operator;
pub mod path;
pub mod permission;
pub mod query;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod service;
pub mod specification;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use condition::{ContainerCondition, ExpressionCondition, FieldCondition, PermissionCondition};
pub use config::{PermissionDefinition, PermissionDocument};
pub use context::EvaluationContext;
pub use document::{parse_document, MAX_COMPARABLE_NUMBER};
pub use error::{AuthzError, Result};
pub use json_path::JsonPath;
pub use mapper::{DynEntityMapper, EntityMapper, EntityMapperRegistry};
pub use operator::ComparisonOperator;
pub use path::FieldPath;
pub use permission::Permission;
pub use query::{ColumnRef, Expression, Predicate, Query, Root, SqlDialect, SqlFragment, SqlRenderer};
pub use resolver::{ActorContext, Placeholder, ValueResolver};
pub use resource::{Properties, PropertyValue, Resource, TypedResource};
pub use schema::{PropertySchema, ResourceSchema, ScalarKind, SchemaRegistry};
pub use service::{AuthorizationService, EngineConfig};
pub use specification::AuthorizationSpecification;
pub use store::{InMemoryPermissionStore, PermissionStore};
pub use types::{Action, Actor, AuthorizationRequest, ConditionValue, Role};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
