//! SQL rendering of predicate trees
//!
//! Literal values are always bound as parameters. Identifiers come from the
//! schema registry and are quoted; JSON paths are validated on parse and
//! inlined.
//!
//! JSON comparisons follow in-memory evaluation: a document that fails strict
//! parsing, a missing value and a value of another kind never match.

use serde::{Deserialize, Serialize};

use crate::document::{F64_OVERFLOW_MAGNITUDE, MAX_COMPARABLE_NUMBER};
use crate::json_path::JsonPath;
use crate::operator::ComparisonOperator;
use crate::schema::ScalarKind;
use crate::types::ConditionValue;

use super::{ColumnRef, Expression, Predicate, Root};

/// Target SQL dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Postgres,
    Sqlite,
}

/// Rendered SQL with positional bind values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub binds: Vec<ConditionValue>,
}

/// Renders predicates for a dialect
#[derive(Debug, Clone, Copy)]
pub struct SqlRenderer {
    dialect: SqlDialect,
}

impl SqlRenderer {
    pub fn new(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Render a predicate as a `WHERE` clause body
    pub fn render(&self, predicate: &Predicate) -> SqlFragment {
        let mut writer = Writer::new(self.dialect);
        writer.predicate(predicate);
        writer.finish()
    }

    /// Render `SELECT <root>.* FROM <table> AS <root> WHERE <predicate>`
    pub fn select(&self, root: &Root, predicate: &Predicate) -> SqlFragment {
        let mut writer = Writer::new(self.dialect);
        writer.sql.push_str(&format!(
            "SELECT {}.* FROM {} AS {} WHERE ",
            quote_ident(root.alias()),
            quote_ident(root.table()),
            quote_ident(root.alias())
        ));
        writer.predicate(predicate);
        writer.finish()
    }
}

struct Writer {
    dialect: SqlDialect,
    sql: String,
    binds: Vec<ConditionValue>,
}

impl Writer {
    fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            sql: String::new(),
            binds: Vec::new(),
        }
    }

    fn finish(self) -> SqlFragment {
        SqlFragment {
            sql: self.sql,
            binds: self.binds,
        }
    }

    fn bind(&mut self, value: &ConditionValue) -> String {
        self.binds.push(value.clone());
        match self.dialect {
            SqlDialect::Sqlite => "?".to_string(),
            SqlDialect::Postgres => format!("${}", self.binds.len()),
        }
    }

    fn predicate(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::Constant(true) => self.sql.push_str("1 = 1"),
            Predicate::Constant(false) => self.sql.push_str("1 = 0"),
            Predicate::And(items) => self.junction(items, " AND "),
            Predicate::Or(items) => self.junction(items, " OR "),
            Predicate::Compare {
                expression,
                operator,
                value,
            } => self.compare(expression, *operator, value),
            Predicate::ColumnsEqual(left, right) => {
                let sql = format!("{} = {}", column(left), column(right));
                self.sql.push_str(&sql);
            }
            Predicate::Exists { root, predicate } => {
                self.sql.push_str(&format!(
                    "EXISTS (SELECT 1 FROM {} AS {} WHERE ",
                    quote_ident(root.table()),
                    quote_ident(root.alias())
                ));
                self.predicate(predicate);
                self.sql.push(')');
            }
        }
    }

    fn junction(&mut self, items: &[Predicate], separator: &str) {
        self.sql.push('(');
        for (idx, item) in items.iter().enumerate() {
            if idx > 0 {
                self.sql.push_str(separator);
            }
            self.predicate(item);
        }
        self.sql.push(')');
    }

    fn compare(&mut self, expression: &Expression, operator: ComparisonOperator, value: &ConditionValue) {
        let sql = match expression {
            Expression::Column { column: col, kind } => {
                let lhs = match (self.dialect, kind) {
                    (SqlDialect::Postgres, ScalarKind::Uuid) => format!("{}::text", column(col)),
                    _ => column(col),
                };
                let bind = self.bind(value);
                format!("{} {} {}", lhs, operator.as_sql(), bind)
            }
            Expression::JsonValue { column: col, path } => match self.dialect {
                SqlDialect::Sqlite => self.sqlite_json(col, path, operator, value),
                SqlDialect::Postgres => self.postgres_json(col, path, operator, value),
            },
        };

        self.sql.push_str(&sql);
    }

    /// The outer `CASE` rejects documents that are malformed, repeat a key
    /// or hold a number overflowing `f64`; the inner one guards the value
    /// kind. `json_tree` only sees valid documents.
    fn sqlite_json(&mut self, col: &ColumnRef, path: &JsonPath, operator: ComparisonOperator, value: &ConditionValue) -> String {
        let document = column(col);
        let path = quote_literal(&path.to_sqlite());
        let tree = format!("json_tree(CASE WHEN json_valid({doc}) THEN {doc} END)", doc = document);
        let usable = format!(
            "json_valid({doc}) \
             AND NOT EXISTS (SELECT 1 FROM {tree} GROUP BY fullkey HAVING count(*) > 1) \
             AND NOT EXISTS (SELECT 1 FROM {tree} WHERE type IN ('integer', 'real') \
             AND atom NOT BETWEEN -{max} AND {max})",
            doc = document,
            tree = tree,
            max = F64_MAX,
        );

        let json_type = format!("json_type({}, {})", document, path);
        let selected = format!("json_extract({}, {})", document, path);
        let kind = match value {
            ConditionValue::Integer(_) | ConditionValue::Float(_) => format!(
                "{} IN ('integer', 'real') AND {} BETWEEN -{max} AND {max}",
                json_type,
                selected,
                max = MAX_COMPARABLE_NUMBER
            ),
            ConditionValue::String(_) => format!("{} = 'text'", json_type),
            ConditionValue::Boolean(_) => format!("{} IN ('true', 'false')", json_type),
        };
        let bind = self.bind(value);

        format!(
            "(CASE WHEN {} THEN CASE WHEN {} THEN {} {} {} END END)",
            usable,
            kind,
            selected,
            operator.as_sql(),
            bind
        )
    }

    /// The column must be `jsonb`. Numbers are compared exactly as
    /// `numeric`; see [`postgres_number`](Self::postgres_number).
    fn postgres_json(&mut self, col: &ColumnRef, path: &JsonPath, operator: ComparisonOperator, value: &ConditionValue) -> String {
        let document = column(col);
        let selected = format!(
            "jsonb_path_query_first({}, {}, '{{}}', true)",
            document,
            quote_literal(&path.to_postgres())
        );
        let text = format!("({} #>> '{{}}')", selected);
        let usable = format!(
            "NOT jsonb_path_exists({}, {})",
            document,
            quote_literal(&format!(
                "$.** ? (@.type() == \"number\" && @.abs() >= {})",
                F64_OVERFLOW_MAGNITUDE
            ))
        );

        match value {
            ConditionValue::String(_) => {
                let bind = self.bind(value);
                format!(
                    "(CASE WHEN {} AND jsonb_typeof({}) = 'string' THEN {} COLLATE \"C\" {} {} END)",
                    usable,
                    selected,
                    text,
                    operator.as_sql(),
                    bind
                )
            }
            ConditionValue::Boolean(_) => {
                let bind = self.bind(value);
                format!(
                    "(CASE WHEN {} AND jsonb_typeof({}) = 'boolean' THEN {}::boolean {} {} END)",
                    usable,
                    selected,
                    text,
                    operator.as_sql(),
                    bind
                )
            }
            ConditionValue::Integer(i) => self.postgres_number(&usable, &selected, &text, operator, *i as f64),
            ConditionValue::Float(f) => self.postgres_number(&usable, &selected, &text, operator, *f),
        }
    }

    /// Compares the JSON number as the nearest `f64`, the way a parsed
    /// document holds it, without casting it to `float8`.
    ///
    /// `round(n) <op> literal` holds exactly when `n` lies on the right side
    /// of the rounding interval of `literal`, whose bounds are the midpoints
    /// to its neighbouring floats. Both sides are doubled so the bounds are
    /// plain sums. Integer text is compared within `±2^53`, text with a
    /// fraction within `±(2^53 + 1)`, which rounds into that range.
    fn postgres_number(
        &mut self,
        usable: &str,
        selected: &str,
        text: &str,
        operator: ComparisonOperator,
        literal: f64,
    ) -> String {
        let literal = if literal == 0.0 { 0.0 } else { literal };
        let (below, above) = neighbours(literal);
        // Ties round to the even significand
        let even = literal.to_bits() & 1 == 0;
        let doubled = format!("2 * {}::numeric", text);

        let comparison = match (operator, even) {
            (ComparisonOperator::EqualTo, true) => {
                let lower = self.doubled_bound(below, literal);
                let upper = self.doubled_bound(literal, above);
                format!("{} BETWEEN {} AND {}", doubled, lower, upper)
            }
            (ComparisonOperator::EqualTo, false) => {
                let lower = self.doubled_bound(below, literal);
                let upper = self.doubled_bound(literal, above);
                format!("{d} > {} AND {d} < {}", lower, upper, d = doubled)
            }
            (operator, even) => {
                let (token, upper) = match (operator, even) {
                    (ComparisonOperator::LessThan, true) => ("<", false),
                    (ComparisonOperator::LessThan, false) => ("<=", false),
                    (ComparisonOperator::LessThanOrEqualTo, true) => ("<=", true),
                    (ComparisonOperator::LessThanOrEqualTo, false) => ("<", true),
                    (ComparisonOperator::GreaterThan, true) => (">", true),
                    (ComparisonOperator::GreaterThan, false) => (">=", true),
                    (ComparisonOperator::GreaterThanOrEqualTo, true) => (">=", false),
                    (_, _) => (">", false),
                };
                let bound = if upper {
                    self.doubled_bound(literal, above)
                } else {
                    self.doubled_bound(below, literal)
                };
                format!("{} {} {}", doubled, token, bound)
            }
        };

        format!(
            "(CASE WHEN {} AND jsonb_typeof({}) = 'number' THEN CASE WHEN abs({t}::numeric) <= \
             CASE WHEN strpos({t}, '.') > 0 THEN {} ELSE {} END THEN {} END END)",
            usable,
            selected,
            MAX_COMPARABLE_NUMBER + 1,
            MAX_COMPARABLE_NUMBER,
            comparison,
            t = text,
        )
    }

    /// `(a + b)` over exact decimal binds
    fn doubled_bound(&mut self, a: f64, b: f64) -> String {
        let a = self.bind(&ConditionValue::String(exact_decimal(a)));
        let b = self.bind(&ConditionValue::String(exact_decimal(b)));
        format!("({}::numeric + {}::numeric)", a, b)
    }
}

/// Largest finite `f64`, as SQLite reads it
const F64_MAX: &str = "1.7976931348623157e308";

/// Adjacent floats below and above `value`
fn neighbours(value: f64) -> (f64, f64) {
    fn next_up(x: f64) -> f64 {
        if x == 0.0 {
            f64::from_bits(1)
        } else if x > 0.0 {
            f64::from_bits(x.to_bits() + 1)
        } else {
            f64::from_bits(x.to_bits() - 1)
        }
    }

    (-next_up(-value), next_up(value))
}

/// Exact decimal expansion of a finite float
fn exact_decimal(value: f64) -> String {
    // 1074 fractional digits cover the smallest subnormal
    let expanded = format!("{:.1074}", value);
    expanded.trim_end_matches('0').trim_end_matches('.').to_string()
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn quote_literal(literal: &str) -> String {
    format!("'{}'", literal.replace('\'', "''"))
}

fn column(col: &ColumnRef) -> String {
    format!("{}.{}", quote_ident(&col.alias), quote_ident(&col.column))
}
