//! Shared fixtures: documents with embedded reviewers, related notes and
//! their attachments, the schemas and mappers for them and an SQLite harness
//! that executes rendered filters.

#![allow(dead_code)]

use std::sync::Arc;

use caseflow_authz::{
    Actor, AuthorizationRequest, AuthorizationService, ConditionValue, EngineConfig, EntityMapper,
    EntityMapperRegistry, InMemoryPermissionStore, Permission, Predicate, Properties, PropertySchema,
    PropertyValue, Query, Resource, ResourceSchema, Result, Root, ScalarKind, SchemaRegistry, SqlDialect,
    SqlFragment, TypedResource,
};
use sqlx::{Connection, Row, SqliteConnection};

pub const ACTOR_ID: &str = "user-1";
pub const ACTOR_EMAIL: &str = "alice@example.com";
pub const ROLE: &str = "ROLE_USER";

#[derive(Debug, Clone, PartialEq)]
pub struct Reviewer {
    pub name: String,
    pub email: String,
}

impl Properties for Reviewer {
    fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        match name {
            "name" => Some(PropertyValue::Text(&self.name)),
            "email" => Some(PropertyValue::Text(&self.email)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub id: i64,
    pub note_id: i64,
    pub kind: String,
}

impl Properties for Attachment {
    fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        match name {
            "id" => Some(PropertyValue::Integer(self.id)),
            "noteId" => Some(PropertyValue::Integer(self.note_id)),
            "kind" => Some(PropertyValue::Text(&self.kind)),
            _ => None,
        }
    }
}

impl Resource for Attachment {
    fn resource_type(&self) -> &'static str {
        Self::RESOURCE_TYPE
    }
}

impl TypedResource for Attachment {
    const RESOURCE_TYPE: &'static str = "attachment";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub document_id: i64,
    pub author: String,
    pub published: bool,
    pub attachments: Vec<Attachment>,
}

impl Properties for Note {
    fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        match name {
            "id" => Some(PropertyValue::Integer(self.id)),
            "documentId" => Some(PropertyValue::Integer(self.document_id)),
            "author" => Some(PropertyValue::Text(&self.author)),
            "published" => Some(PropertyValue::Boolean(self.published)),
            _ => None,
        }
    }
}

impl Resource for Note {
    fn resource_type(&self) -> &'static str {
        Self::RESOURCE_TYPE
    }
}

impl TypedResource for Note {
    const RESOURCE_TYPE: &'static str = "note";
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub status: String,
    pub owner: String,
    pub priority: i64,
    pub score: f64,
    pub archived: bool,
    pub reviewer: Option<Reviewer>,
    pub data: Option<String>,
    pub notes: Vec<Note>,
}

impl Document {
    pub fn new(id: i64) -> Self {
        Self {
            id,
            title: format!("Document {}", id),
            status: "open".to_string(),
            owner: ACTOR_ID.to_string(),
            priority: 0,
            score: 0.0,
            archived: false,
            reviewer: None,
            data: None,
            notes: Vec::new(),
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }

    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_reviewer(mut self, name: &str) -> Self {
        self.reviewer = Some(Reviewer {
            name: name.to_string(),
            email: format!("{}@example.com", name),
        });
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data.to_string());
        self
    }

    pub fn with_raw_data(mut self, data: &str) -> Self {
        self.data = Some(data.to_string());
        self
    }

    pub fn with_note(mut self, author: &str, published: bool) -> Self {
        let id = self.id * 100 + self.notes.len() as i64;
        self.notes.push(Note {
            id,
            document_id: self.id,
            author: author.to_string(),
            published,
            attachments: Vec::new(),
        });
        self
    }

    /// Attach a file of `kind` to the most recently added note
    pub fn with_attachment(mut self, kind: &str) -> Self {
        if let Some(note) = self.notes.last_mut() {
            let id = note.id * 10 + note.attachments.len() as i64;
            note.attachments.push(Attachment {
                id,
                note_id: note.id,
                kind: kind.to_string(),
            });
        }
        self
    }
}

impl Properties for Document {
    fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        match name {
            "id" => Some(PropertyValue::Integer(self.id)),
            "title" => Some(PropertyValue::Text(&self.title)),
            "status" => Some(PropertyValue::Text(&self.status)),
            "owner" => Some(PropertyValue::Text(&self.owner)),
            "priority" => Some(PropertyValue::Integer(self.priority)),
            "score" => Some(PropertyValue::Float(self.score)),
            "archived" => Some(PropertyValue::Boolean(self.archived)),
            "reviewer" => Some(match &self.reviewer {
                Some(reviewer) => PropertyValue::Embedded(reviewer),
                None => PropertyValue::Null,
            }),
            "data" => Some(match &self.data {
                Some(data) => PropertyValue::Text(data),
                None => PropertyValue::Null,
            }),
            _ => None,
        }
    }
}

impl Resource for Document {
    fn resource_type(&self) -> &'static str {
        Self::RESOURCE_TYPE
    }
}

impl TypedResource for Document {
    const RESOURCE_TYPE: &'static str = "document";
}

/// Relates a document to its notes through `notes.document_id`
pub struct DocumentNotes;

impl EntityMapper for DocumentNotes {
    type From = Document;
    type To = Note;

    fn map_related(&self, entity: &Document) -> Vec<Note> {
        entity.notes.clone()
    }

    fn map_query(&self, root: &Root, query: &mut Query<'_>) -> Result<(Root, Predicate)> {
        query.join_on(root.id(), Note::RESOURCE_TYPE, "documentId")
    }
}

/// Relates a note to its attachments through `attachments.note_id`
pub struct NoteAttachments;

impl EntityMapper for NoteAttachments {
    type From = Note;
    type To = Attachment;

    fn map_related(&self, entity: &Note) -> Vec<Attachment> {
        entity.attachments.clone()
    }

    fn map_query(&self, root: &Root, query: &mut Query<'_>) -> Result<(Root, Predicate)> {
        query.join_on(root.id(), Attachment::RESOURCE_TYPE, "noteId")
    }
}

pub fn schemas() -> SchemaRegistry {
    SchemaRegistry::new()
        .with_schema(
            ResourceSchema::new("document", "documents")
                .with_property(PropertySchema::scalar("id", ScalarKind::Integer))
                .with_property(PropertySchema::scalar("title", ScalarKind::Text))
                .with_property(PropertySchema::scalar("status", ScalarKind::Text))
                .with_property(PropertySchema::scalar("owner", ScalarKind::Text))
                .with_property(PropertySchema::scalar("priority", ScalarKind::Integer))
                .with_property(PropertySchema::scalar("score", ScalarKind::Float))
                .with_property(PropertySchema::scalar("archived", ScalarKind::Boolean))
                .with_property(PropertySchema::embedded(
                    "reviewer",
                    vec![
                        PropertySchema::scalar("name", ScalarKind::Text),
                        PropertySchema::scalar("email", ScalarKind::Text),
                    ],
                ))
                .with_property(PropertySchema::scalar("data", ScalarKind::Json)),
        )
        .with_schema(
            ResourceSchema::new("note", "notes")
                .with_property(PropertySchema::scalar("id", ScalarKind::Integer))
                .with_property(PropertySchema::scalar("documentId", ScalarKind::Integer).with_column("document_id"))
                .with_property(PropertySchema::scalar("author", ScalarKind::Text))
                .with_property(PropertySchema::scalar("published", ScalarKind::Boolean)),
        )
        .with_schema(
            ResourceSchema::new("attachment", "attachments")
                .with_property(PropertySchema::scalar("id", ScalarKind::Integer))
                .with_property(PropertySchema::scalar("noteId", ScalarKind::Integer).with_column("note_id"))
                .with_property(PropertySchema::scalar("kind", ScalarKind::Text)),
        )
}

pub fn mappers() -> EntityMapperRegistry {
    EntityMapperRegistry::new()
        .with_mapper(DocumentNotes)
        .with_mapper(NoteAttachments)
}

pub fn actor() -> Actor {
    Actor::new(ACTOR_ID, ACTOR_EMAIL).with_role(ROLE)
}

pub fn view_documents() -> AuthorizationRequest {
    AuthorizationRequest::new("document", "view")
}

/// Service over the fixture schemas with `permissions` stored as-is
pub fn service(permissions: Vec<Permission>) -> AuthorizationService {
    AuthorizationService::new(
        EngineConfig {
            dialect: SqlDialect::Sqlite,
            validate_on_deploy: true,
        },
        Arc::new(schemas()),
        Arc::new(mappers()),
        Arc::new(InMemoryPermissionStore::with_permissions(permissions)),
    )
}

/// Grant `view` on documents to the fixture role under `conditions`
pub fn view_permission(conditions: Vec<caseflow_authz::PermissionCondition>) -> Permission {
    Permission::new("document", "view", ROLE, conditions)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory SQLite database holding the fixture tables
pub struct Database {
    conn: SqliteConnection,
}

impl Database {
    pub async fn open() -> Self {
        let mut conn = SqliteConnection::connect("sqlite::memory:").await.unwrap();

        for statement in [
            "CREATE TABLE documents (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                status TEXT NOT NULL,
                owner TEXT NOT NULL,
                priority INTEGER NOT NULL,
                score REAL NOT NULL,
                archived BOOLEAN NOT NULL,
                reviewer_name TEXT,
                reviewer_email TEXT,
                data TEXT
            )",
            "CREATE TABLE notes (
                id INTEGER PRIMARY KEY,
                document_id INTEGER NOT NULL,
                author TEXT NOT NULL,
                published BOOLEAN NOT NULL
            )",
            "CREATE TABLE attachments (
                id INTEGER PRIMARY KEY,
                note_id INTEGER NOT NULL,
                kind TEXT NOT NULL
            )",
        ] {
            sqlx::query(statement).execute(&mut conn).await.unwrap();
        }

        Self { conn }
    }

    pub async fn with_documents(documents: &[Document]) -> Self {
        let mut db = Self::open().await;
        for document in documents {
            db.insert(document).await;
        }
        db
    }

    pub async fn insert(&mut self, document: &Document) {
        sqlx::query(
            "INSERT INTO documents
                (id, title, status, owner, priority, score, archived, reviewer_name, reviewer_email, data)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id)
        .bind(&document.title)
        .bind(&document.status)
        .bind(&document.owner)
        .bind(document.priority)
        .bind(document.score)
        .bind(document.archived)
        .bind(document.reviewer.as_ref().map(|r| r.name.clone()))
        .bind(document.reviewer.as_ref().map(|r| r.email.clone()))
        .bind(document.data.clone())
        .execute(&mut self.conn)
        .await
        .unwrap();

        for note in &document.notes {
            sqlx::query("INSERT INTO notes (id, document_id, author, published) VALUES (?, ?, ?, ?)")
                .bind(note.id)
                .bind(note.document_id)
                .bind(&note.author)
                .bind(note.published)
                .execute(&mut self.conn)
                .await
                .unwrap();

            for attachment in &note.attachments {
                sqlx::query("INSERT INTO attachments (id, note_id, kind) VALUES (?, ?, ?)")
                    .bind(attachment.id)
                    .bind(attachment.note_id)
                    .bind(&attachment.kind)
                    .execute(&mut self.conn)
                    .await
                    .unwrap();
            }
        }
    }

    /// Execute a rendered `SELECT` and return the selected ids in order
    pub async fn ids(&mut self, fragment: &SqlFragment) -> Vec<i64> {
        let mut query = sqlx::query(&fragment.sql);
        for value in &fragment.binds {
            query = match value {
                ConditionValue::Boolean(b) => query.bind(*b),
                ConditionValue::Integer(i) => query.bind(*i),
                ConditionValue::Float(f) => query.bind(*f),
                ConditionValue::String(s) => query.bind(s.clone()),
            };
        }

        let rows = query
            .fetch_all(&mut self.conn)
            .await
            .unwrap_or_else(|e| panic!("query failed: {}\n{}", e, fragment.sql));

        let mut ids: Vec<i64> = rows.iter().map(|row| row.get::<i64, _>("id")).collect();
        ids.sort_unstable();
        ids
    }

    /// Raw scalar query, for single-row checks
    pub async fn scalar_bool(&mut self, sql: &str, binds: &[ConditionValue]) -> bool {
        let mut query = sqlx::query(sql);
        for value in binds {
            query = match value {
                ConditionValue::Boolean(b) => query.bind(*b),
                ConditionValue::Integer(i) => query.bind(*i),
                ConditionValue::Float(f) => query.bind(*f),
                ConditionValue::String(s) => query.bind(s.clone()),
            };
        }

        let row = query
            .fetch_one(&mut self.conn)
            .await
            .unwrap_or_else(|e| panic!("query failed: {}\n{}", e, sql));
        row.get::<Option<i64>, _>(0).unwrap_or(0) != 0
    }

    pub async fn execute(&mut self, sql: &str) {
        sqlx::query(sql).execute(&mut self.conn).await.unwrap();
    }
}

/// Ids of the documents the service authorizes in memory
pub fn authorized_in_memory(
    service: &AuthorizationService,
    request: &AuthorizationRequest,
    documents: &[Document],
) -> Result<Vec<i64>> {
    let actor = actor();
    let mut ids = Vec::new();

    for document in documents {
        if service.has_permission(&actor, request, Some(document))? {
            ids.push(document.id);
        }
    }

    ids.sort_unstable();
    Ok(ids)
}

/// Ids of the documents the service's query filter selects
pub async fn authorized_in_query(
    service: &AuthorizationService,
    request: &AuthorizationRequest,
    db: &mut Database,
) -> Result<Vec<i64>> {
    let fragment = service.filtered_select(&actor(), request)?;
    Ok(db.ids(&fragment).await)
}
