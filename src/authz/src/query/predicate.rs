//! Predicate tree produced by query-level evaluation

use crate::json_path::JsonPath;
use crate::operator::ComparisonOperator;
use crate::schema::ScalarKind;
use crate::types::ConditionValue;

use super::Root;

/// Column of an aliased table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

/// Comparable expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Plain column value
    Column { column: ColumnRef, kind: ScalarKind },

    /// Value selected by a JSON path from a column holding a JSON document
    ///
    /// The extracted value is typed by the literal it is compared with; a
    /// value of another JSON type never matches.
    JsonValue { column: ColumnRef, path: JsonPath },
}

/// Filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Constant(bool),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Compare {
        expression: Expression,
        operator: ComparisonOperator,
        value: ConditionValue,
    },
    ColumnsEqual(ColumnRef, ColumnRef),
    /// At least one row of `root` satisfies `predicate`
    Exists { root: Root, predicate: Box<Predicate> },
}

impl Predicate {
    /// Conjunction; an empty conjunction is `true`
    pub fn and(items: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut parts = Vec::new();

        for item in items {
            match item {
                Predicate::Constant(true) => {}
                Predicate::Constant(false) => return Predicate::Constant(false),
                Predicate::And(nested) => parts.extend(nested),
                other => parts.push(other),
            }
        }

        match parts.len() {
            0 => Predicate::Constant(true),
            1 => parts.remove(0),
            _ => Predicate::And(parts),
        }
    }

    /// Disjunction; an empty disjunction is `false`
    pub fn or(items: impl IntoIterator<Item = Predicate>) -> Predicate {
        let mut parts = Vec::new();

        for item in items {
            match item {
                Predicate::Constant(false) => {}
                Predicate::Constant(true) => return Predicate::Constant(true),
                Predicate::Or(nested) => parts.extend(nested),
                other => parts.push(other),
            }
        }

        match parts.len() {
            0 => Predicate::Constant(false),
            1 => parts.remove(0),
            _ => Predicate::Or(parts),
        }
    }

    /// Existential subquery over a joined root
    pub fn exists(root: Root, predicate: Predicate) -> Predicate {
        match predicate {
            Predicate::Constant(false) => Predicate::Constant(false),
            predicate => Predicate::Exists {
                root,
                predicate: Box::new(predicate),
            },
        }
    }

    /// Join condition between two columns
    pub fn columns_equal(left: ColumnRef, right: ColumnRef) -> Predicate {
        Predicate::ColumnsEqual(left, right)
    }

    /// Whether this predicate matches no rows
    pub fn is_never(&self) -> bool {
        matches!(self, Predicate::Constant(false))
    }
}
