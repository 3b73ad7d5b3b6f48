//! Query-level evaluation model
//!
//! Conditions lower themselves into a [`Predicate`] tree over [`Root`]s
//! allocated from a [`Query`]. The tree is independent of any database and is
//! rendered to SQL by [`SqlRenderer`].

mod predicate;
mod sql;

pub use predicate::{ColumnRef, Expression, Predicate};
pub use sql::{SqlDialect, SqlFragment, SqlRenderer};

use crate::error::Result;
use crate::path::FieldPath;
use crate::schema::{ResolvedField, SchemaRegistry};

/// A table occurrence in the query, positioned at one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    alias: String,
    resource_type: String,
    table: String,
    id_column: String,
}

impl Root {
    /// Table alias (`t0`, `t1`, ...)
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Resource type stored at this root
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Underlying table
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key column of this root
    pub fn id(&self) -> ColumnRef {
        ColumnRef::new(&self.alias, &self.id_column)
    }
}

/// Query under construction
///
/// Allocates aliases for the main root and every joined root, and resolves
/// field paths to columns through the schema registry.
pub struct Query<'s> {
    schemas: &'s SchemaRegistry,
    next_alias: usize,
}

impl<'s> Query<'s> {
    /// Create a query resolving paths against `schemas`
    pub fn new(schemas: &'s SchemaRegistry) -> Self {
        Self {
            schemas,
            next_alias: 0,
        }
    }

    /// Allocate a new root for a resource type
    pub fn root(&mut self, resource_type: &str) -> Result<Root> {
        let schema = self.schemas.get(resource_type)?;
        let alias = format!("t{}", self.next_alias);
        self.next_alias += 1;

        Ok(Root {
            alias,
            resource_type: schema.resource_type.clone(),
            table: schema.table.clone(),
            id_column: schema.id_column.clone(),
        })
    }

    /// Resolve a field path on a root
    pub fn resolve(&self, root: &Root, path: &FieldPath) -> Result<ResolvedField> {
        self.schemas.resolve(&root.resource_type, path)
    }

    /// Typed column expression for a field path on a root
    pub fn get(&self, root: &Root, path: &FieldPath) -> Result<Expression> {
        let resolved = self.resolve(root, path)?;
        Ok(Expression::Column {
            column: ColumnRef::new(&root.alias, &resolved.column),
            kind: resolved.kind,
        })
    }

    /// Column reference for a dotted path on a root
    pub fn column(&self, root: &Root, path: &str) -> Result<ColumnRef> {
        let resolved = self.resolve(root, &FieldPath::new(path)?)?;
        Ok(ColumnRef::new(&root.alias, &resolved.column))
    }

    /// Join a new root of `to_type` whose `to_path` column equals `from`
    ///
    /// Convenience for entity mappers backed by a foreign key.
    pub fn join_on(&mut self, from: ColumnRef, to_type: &str, to_path: &str) -> Result<(Root, Predicate)> {
        let joined = self.root(to_type)?;
        let to = self.column(&joined, to_path)?;
        Ok((joined, Predicate::columns_equal(to, from)))
    }

    /// Schema registry backing this query
    pub fn schemas(&self) -> &SchemaRegistry {
        self.schemas
    }
}
