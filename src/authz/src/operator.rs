//! Comparison operators shared by in-memory and query evaluation

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::query::{Expression, Predicate};
use crate::types::ConditionValue;

/// Three-way comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    EqualTo,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = "<=")]
    LessThanOrEqualTo,
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterThanOrEqualTo,
}

impl ComparisonOperator {
    /// All operators
    pub const ALL: [ComparisonOperator; 5] = [
        Self::EqualTo,
        Self::LessThan,
        Self::LessThanOrEqualTo,
        Self::GreaterThan,
        Self::GreaterThanOrEqualTo,
    ];

    /// Whether a comparison result satisfies this operator
    ///
    /// Incomparable values (`None`) never satisfy any operator.
    pub fn matches(self, ordering: Option<Ordering>) -> bool {
        let Some(ordering) = ordering else {
            return false;
        };

        match self {
            Self::EqualTo => ordering == Ordering::Equal,
            Self::LessThan => ordering == Ordering::Less,
            Self::LessThanOrEqualTo => ordering != Ordering::Greater,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::GreaterThanOrEqualTo => ordering != Ordering::Less,
        }
    }

    /// Evaluate `left <op> right` in memory
    pub fn evaluate<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        self.matches(left.partial_cmp(right))
    }

    /// Evaluate `left <op> right` over condition values
    pub fn evaluate_values(self, left: &ConditionValue, right: &ConditionValue) -> bool {
        self.matches(left.compare(right))
    }

    /// Build the equivalent query predicate `expression <op> value`
    pub fn to_predicate(self, expression: Expression, value: ConditionValue) -> Predicate {
        Predicate::Compare {
            expression,
            operator: self,
            value,
        }
    }

    /// SQL operator token
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::EqualTo => "=",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
        }
    }

    /// Configuration symbol
    pub fn symbol(self) -> &'static str {
        match self {
            Self::EqualTo => "==",
            other => other.as_sql(),
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
