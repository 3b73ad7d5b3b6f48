//! In-memory evaluation of conditions, permissions and specifications

mod common;

use std::sync::Arc;

use caseflow_authz::{
    Action, Actor, AuthorizationSpecification, AuthzError, ComparisonOperator, ContainerCondition,
    EntityMapperRegistry, EvaluationContext, ExpressionCondition, FieldCondition, Permission,
    PermissionCondition, Properties, PropertySchema, PropertyValue, Resource, ResourceSchema, ScalarKind,
    SchemaRegistry,
};
use serde_json::json;

use common::{actor, service, Document, ACTOR_EMAIL, ROLE};

struct TestChildEntity {
    property: String,
}

impl Properties for TestChildEntity {
    fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        match name {
            "property" => Some(PropertyValue::Text(&self.property)),
            _ => None,
        }
    }
}

struct TestEntity {
    child: TestChildEntity,
}

impl Properties for TestEntity {
    fn property(&self, name: &str) -> Option<PropertyValue<'_>> {
        match name {
            "child" => Some(PropertyValue::Embedded(&self.child)),
            _ => None,
        }
    }
}

impl Resource for TestEntity {
    fn resource_type(&self) -> &'static str {
        "test-entity"
    }
}

fn test_entity_context() -> EvaluationContext {
    let schemas = SchemaRegistry::new().with_schema(
        ResourceSchema::new("test-entity", "test_entity").with_property(PropertySchema::embedded(
            "child",
            vec![PropertySchema::scalar("property", ScalarKind::Text)],
        )),
    );

    EvaluationContext::new(
        Arc::new(schemas),
        Arc::new(EntityMapperRegistry::new()),
        Arc::new(Actor::new("user-1", "alice@example.com")),
    )
}

fn document_context() -> EvaluationContext {
    service(Vec::new()).context(&actor())
}

fn field(path: &str, value: &str) -> PermissionCondition {
    FieldCondition::new(path, value).unwrap().into()
}

fn expression(path: &str, operator: ComparisonOperator, value: impl Into<caseflow_authz::ConditionValue>) -> PermissionCondition {
    ExpressionCondition::new("data", path, operator, value).unwrap().into()
}

#[test]
fn test_field_condition_on_nested_property() {
    let context = test_entity_context();
    let entity = TestEntity {
        child: TestChildEntity {
            property: "true".to_string(),
        },
    };

    assert!(field("child.property", "true").is_valid(&entity, &context).unwrap());
    assert!(!field("child.property", "false").is_valid(&entity, &context).unwrap());

    let missing = field("child.non-existent", "true").is_valid(&entity, &context);
    assert!(matches!(missing, Err(AuthzError::FieldNotFound { .. })));
}

#[test]
fn test_field_condition_stringifies_values() {
    let context = document_context();
    let document = Document::new(7).with_priority(3).with_reviewer("bob");

    assert!(field("priority", "3").is_valid(&document, &context).unwrap());
    assert!(!field("priority", "03").is_valid(&document, &context).unwrap());
    assert!(field("archived", "false").is_valid(&document, &context).unwrap());
    assert!(field("score", "0").is_valid(&document, &context).unwrap());
    assert!(field("id", "7").is_valid(&document, &context).unwrap());
    assert!(field("reviewer.name", "bob").is_valid(&document, &context).unwrap());
    assert!(!field("reviewer.name", "Bob").is_valid(&document, &context).unwrap());
}

#[test]
fn test_field_condition_never_matches_null() {
    let context = document_context();
    let document = Document::new(1);

    assert!(!field("reviewer.name", "").is_valid(&document, &context).unwrap());
    assert!(!field("reviewer.name", "null").is_valid(&document, &context).unwrap());
    assert!(!field("data", "null").is_valid(&document, &context).unwrap());
}

#[test]
fn test_expression_condition_compares_typed_values() {
    let context = document_context();
    let document = Document::new(1).with_data(json!({
        "amount": 250,
        "ratio": 0.5,
        "label": "urgent",
        "flags": {"approved": true},
        "items": [3, 4]
    }));

    let cases = [
        (expression("$.amount", ComparisonOperator::GreaterThanOrEqualTo, 250i64), true),
        (expression("$.amount", ComparisonOperator::GreaterThan, 250i64), false),
        (expression("$.amount", ComparisonOperator::LessThan, 250.5), true),
        (expression("$.ratio", ComparisonOperator::EqualTo, 0.5), true),
        (expression("$.label", ComparisonOperator::EqualTo, "urgent"), true),
        (expression("$.label", ComparisonOperator::LessThan, "v"), true),
        (expression("$.flags.approved", ComparisonOperator::EqualTo, true), true),
        (expression("$.items[1]", ComparisonOperator::EqualTo, 4i64), true),
        (expression("$['label']", ComparisonOperator::EqualTo, "urgent"), true),
    ];

    for (condition, expected) in cases {
        assert_eq!(condition.is_valid(&document, &context).unwrap(), expected, "{:?}", condition);
    }
}

#[test]
fn test_expression_condition_is_false_on_missing_or_mismatched_values() {
    let context = document_context();
    let document = Document::new(1).with_data(json!({"amount": 250, "label": "250"}));

    let cases = [
        expression("$.missing", ComparisonOperator::EqualTo, 1i64),
        expression("$.amount.deeper", ComparisonOperator::EqualTo, 1i64),
        expression("$.amount", ComparisonOperator::EqualTo, "250"),
        expression("$.label", ComparisonOperator::EqualTo, 250i64),
        expression("$", ComparisonOperator::EqualTo, "x"),
    ];

    for condition in cases {
        assert!(!condition.is_valid(&document, &context).unwrap(), "{:?}", condition);
    }

    let invalid = Document::new(2).with_raw_data("not json");
    let condition = expression("$.amount", ComparisonOperator::EqualTo, 250i64);
    assert!(!condition.is_valid(&invalid, &context).unwrap());

    let empty = Document::new(3);
    assert!(!condition.is_valid(&empty, &context).unwrap());
}

#[test]
fn test_expression_condition_resolves_placeholders() {
    let context = document_context();
    let document = Document::new(1).with_data(json!({"assignee": ACTOR_EMAIL}));

    assert!(expression("$.assignee", ComparisonOperator::EqualTo, "${currentUserEmail}")
        .is_valid(&document, &context)
        .unwrap());
    assert!(!expression("$.assignee", ComparisonOperator::EqualTo, "${currentUserId}")
        .is_valid(&document, &context)
        .unwrap());
}

#[test]
fn test_unknown_placeholder_is_configuration_error() {
    let context = document_context();
    let document = Document::new(1).with_data(json!({"assignee": "${currentUserPhone}"}));

    let result = expression("$.assignee", ComparisonOperator::EqualTo, "${currentUserPhone}")
        .is_valid(&document, &context);

    assert!(matches!(result, Err(AuthzError::Configuration(_))));
}

#[test]
fn test_expression_condition_requires_document_field() {
    let context = document_context();
    let document = Document::new(1);

    let condition: PermissionCondition =
        ExpressionCondition::new("priority", "$.x", ComparisonOperator::EqualTo, 1i64)
            .unwrap()
            .into();
    assert!(matches!(condition.is_valid(&document, &context), Err(AuthzError::Configuration(_))));

    let missing: PermissionCondition =
        ExpressionCondition::new("payload", "$.x", ComparisonOperator::EqualTo, 1i64)
            .unwrap()
            .into();
    assert!(matches!(missing.is_valid(&document, &context), Err(AuthzError::FieldNotFound { .. })));

    let text: PermissionCondition = ExpressionCondition::new("title", "$.x", ComparisonOperator::EqualTo, 1i64)
        .unwrap()
        .into();
    assert!(matches!(text.is_valid(&document, &context), Err(AuthzError::Configuration(_))));
}

#[test]
fn test_expression_condition_rejects_unusable_documents() {
    let context = document_context();
    let condition: PermissionCondition =
        ExpressionCondition::new("data", "$.owner", ComparisonOperator::EqualTo, "alice")
            .unwrap()
            .into();

    let plain = Document::new(1).with_raw_data(r#"{"owner": "alice"}"#);
    assert!(condition.is_valid(&plain, &context).unwrap());

    for payload in [
        r#"{"owner": "alice", "owner": "bob"}"#,
        r#"{"owner": "bob", "owner": "alice"}"#,
        r#"{"owner": "alice", "size": 1e400}"#,
    ] {
        let document = Document::new(1).with_raw_data(payload);
        assert!(!condition.is_valid(&document, &context).unwrap(), "{}", payload);
    }
}

#[test]
fn test_container_condition_is_existential() {
    let context = document_context();
    let condition: PermissionCondition = ContainerCondition::new(
        "note",
        vec![field("author", "alice"), field("published", "true")],
    )
    .into();

    let no_notes = Document::new(1);
    assert!(!condition.is_valid(&no_notes, &context).unwrap());

    let one_match = Document::new(2).with_note("alice", true);
    assert!(condition.is_valid(&one_match, &context).unwrap());

    let one_miss = Document::new(3).with_note("alice", false);
    assert!(!condition.is_valid(&one_miss, &context).unwrap());

    let mixed = Document::new(4)
        .with_note("bob", true)
        .with_note("alice", false)
        .with_note("alice", true);
    assert!(condition.is_valid(&mixed, &context).unwrap());

    let split = Document::new(5).with_note("bob", true).with_note("alice", false);
    assert!(!condition.is_valid(&split, &context).unwrap());
}

#[test]
fn test_container_condition_without_nested_conditions() {
    let context = document_context();
    let condition: PermissionCondition = ContainerCondition::new("note", Vec::new()).into();

    assert!(!condition.is_valid(&Document::new(1), &context).unwrap());
    assert!(condition.is_valid(&Document::new(2).with_note("bob", false), &context).unwrap());
}

#[test]
fn test_container_condition_without_mapper() {
    let context = test_entity_context();
    let entity = TestEntity {
        child: TestChildEntity {
            property: "true".to_string(),
        },
    };

    let condition: PermissionCondition = ContainerCondition::new("note", vec![field("author", "alice")]).into();
    let result = condition.is_valid(&entity, &context);

    assert!(matches!(result, Err(AuthzError::MapperNotFound { .. })));
}

#[test]
fn test_container_condition_propagates_nested_errors() {
    let context = document_context();
    let condition: PermissionCondition = ContainerCondition::new("note", vec![field("editor", "alice")]).into();

    let result = condition.is_valid(&Document::new(1).with_note("alice", true), &context);
    assert!(matches!(result, Err(AuthzError::FieldNotFound { .. })));
}

#[test]
fn test_permission_is_conjunction_in_any_order() {
    let context = document_context();
    let document = Document::new(1).with_status("open").with_priority(2);

    let holds = field("status", "open");
    let fails = field("priority", "5");

    let forward = Permission::new("document", "view", ROLE, vec![holds.clone(), fails.clone()]);
    let backward = Permission::new("document", "view", ROLE, vec![fails, holds.clone()]);
    let both = Permission::new("document", "view", ROLE, vec![holds.clone(), field("priority", "2")]);

    assert!(!forward.applies_to("document", Some(&document), &context).unwrap());
    assert!(!backward.applies_to("document", Some(&document), &context).unwrap());
    assert!(both.applies_to("document", Some(&document), &context).unwrap());

    assert!(!both.applies_to("note", Some(&document), &context).unwrap());
    assert!(!both.applies_to("document", None, &context).unwrap());

    let unconditional = Permission::new("document", "view", ROLE, Vec::new());
    assert!(unconditional.applies_to("document", Some(&document), &context).unwrap());
    assert!(!unconditional.applies_to("document", None, &context).unwrap());
}

#[test]
fn test_specification_is_disjunction() {
    let context = document_context();
    let action = Action::new("document", "view");
    let open = Document::new(1).with_status("open");
    let closed = Document::new(2).with_status("closed");
    let draft = Document::new(3).with_status("draft");

    let specification = AuthorizationSpecification::new(
        &context,
        "document",
        action.clone(),
        vec![
            Permission::new("document", "view", ROLE, vec![field("status", "open")]),
            Permission::new("document", "view", ROLE, vec![field("status", "closed")]),
            Permission::new("document", "delete", ROLE, vec![field("status", "draft")]),
        ],
    );

    assert_eq!(specification.permissions().len(), 2);
    assert!(specification.is_authorized(Some(&open)).unwrap());
    assert!(specification.is_authorized(Some(&closed)).unwrap());
    assert!(!specification.is_authorized(Some(&draft)).unwrap());
    assert!(!specification.is_authorized(None).unwrap());
}

#[test]
fn test_specification_without_permissions_denies() {
    let context = document_context();
    let specification =
        AuthorizationSpecification::new(&context, "document", Action::new("document", "view"), Vec::new());

    assert!(!specification.is_authorized(Some(&Document::new(1))).unwrap());
}

#[test]
fn test_specification_surfaces_errors_instead_of_denying() {
    let context = document_context();
    let specification = AuthorizationSpecification::new(
        &context,
        "document",
        Action::new("document", "view"),
        vec![Permission::new("document", "view", ROLE, vec![field("missing", "x")])],
    );

    let err = specification.is_authorized(Some(&Document::new(1))).unwrap_err();
    assert!(err.is_configuration_error());
}
