//! Relational Criteria Translation
//!
//! Pure function from the neutral criteria to an ordered predicate list
//! combined with logical AND, plus sort/offset/limit modifiers. The list
//! renders to parameterized SQL for execution and to literal SQL for the
//! diagnostic log line.
//!
//! A range with both bounds present renders as one inclusive
//! `BETWEEN g AND l`; the document backend emits independent exclusive
//! comparisons instead. Callers must not rely on boundary inclusivity.

use std::fmt;

use crate::criteria::{bound_present, Condition, Search, Sort, SortOrder};
use crate::value::Value;

// =============================================================================
// Predicates
// =============================================================================

/// One translated `WHERE` clause member.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `"field" = value`
    Equals(String, Value),
    /// `"field" ~ pattern` (regular-expression match)
    Matches(String, String),
    /// `"field" BETWEEN low AND high` (inclusive)
    Between(String, f64, f64),
    /// `"field" > bound`
    GreaterThan(String, f64),
    /// `"field" < bound`
    LessThan(String, f64),
}

/// Quote an identifier for SQL.
#[must_use]
pub(crate) fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn literal(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Num(n) => format!("{n}"),
        Value::Bool(b) => format!("{b}"),
        Value::Date(d) => format!("'{}'", d.to_rfc3339()),
        Value::Null => "NULL".to_string(),
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equals(field, value) => {
                write!(f, "{} = {}", quote_ident(field), literal(value))
            }
            Self::Matches(field, pattern) => {
                write!(f, "{} ~ {}", quote_ident(field), literal(&Value::Str(pattern.clone())))
            }
            Self::Between(field, low, high) => {
                write!(f, "{} BETWEEN {low} AND {high}", quote_ident(field))
            }
            Self::GreaterThan(field, bound) => {
                write!(f, "{} > {bound}", quote_ident(field))
            }
            Self::LessThan(field, bound) => {
                write!(f, "{} < {bound}", quote_ident(field))
            }
        }
    }
}

// =============================================================================
// SelectQuery
// =============================================================================

/// A translated select: predicates plus modifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// `WHERE` members, AND-combined; empty means no `WHERE` clause
    pub predicates: Vec<Predicate>,
    /// At most one `ORDER BY` key
    pub order: Option<(String, SortOrder)>,
    /// Rows to skip
    pub offset: Option<u64>,
    /// Row count cap
    pub limit: Option<u64>,
}

impl SelectQuery {
    /// A query matching every row.
    #[must_use]
    pub fn match_all() -> Self {
        Self::default()
    }

    /// Single-predicate query, the shape `fetch`/`fetch_all` use.
    #[must_use]
    pub fn filter(predicate: Predicate) -> Self {
        Self {
            predicates: vec![predicate],
            ..Self::default()
        }
    }

    /// `WHERE` fragment with literal values, for diagnostics. `None` when
    /// the query matches everything.
    #[must_use]
    pub fn where_sql(&self) -> Option<String> {
        if self.predicates.is_empty() {
            return None;
        }
        let clauses: Vec<String> = self.predicates.iter().map(ToString::to_string).collect();
        Some(format!("WHERE {}", clauses.join(" AND ")))
    }

    /// Full parameterized statement plus bind values in placeholder order.
    #[must_use]
    pub fn to_sql(&self, table: &str) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT * FROM {}", quote_ident(table));
        let mut binds: Vec<Value> = Vec::new();

        if !self.predicates.is_empty() {
            let mut clauses: Vec<String> = Vec::with_capacity(self.predicates.len());
            for predicate in &self.predicates {
                match predicate {
                    Predicate::Equals(field, value) => {
                        binds.push(value.clone());
                        clauses.push(format!("{} = ${}", quote_ident(field), binds.len()));
                    }
                    Predicate::Matches(field, pattern) => {
                        binds.push(Value::Str(pattern.clone()));
                        clauses.push(format!("{} ~ ${}", quote_ident(field), binds.len()));
                    }
                    Predicate::Between(field, low, high) => {
                        binds.push(Value::Num(*low));
                        binds.push(Value::Num(*high));
                        clauses.push(format!(
                            "{} BETWEEN ${} AND ${}",
                            quote_ident(field),
                            binds.len() - 1,
                            binds.len()
                        ));
                    }
                    Predicate::GreaterThan(field, bound) => {
                        binds.push(Value::Num(*bound));
                        clauses.push(format!("{} > ${}", quote_ident(field), binds.len()));
                    }
                    Predicate::LessThan(field, bound) => {
                        binds.push(Value::Num(*bound));
                        clauses.push(format!("{} < ${}", quote_ident(field), binds.len()));
                    }
                }
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        if let Some((field, order)) = &self.order {
            let direction = match order {
                SortOrder::Ascending => "ASC",
                SortOrder::Descending => "DESC",
            };
            sql.push_str(&format!(" ORDER BY {} {}", quote_ident(field), direction));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {offset}"));
        }

        (sql, binds)
    }
}

// =============================================================================
// Translation
// =============================================================================

/// Translate neutral search criteria into an ordered predicate list.
///
/// Unset fields emit nothing; a range with no truthy bound emits nothing.
#[must_use]
pub fn translate_search(search: &Search) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    for (field, condition) in search.iter() {
        let Some(condition) = condition else {
            continue;
        };

        match condition {
            Condition::Equals(value) => {
                predicates.push(Predicate::Equals(field.to_string(), value.clone()));
            }
            Condition::Matches(pattern) => {
                predicates.push(Predicate::Matches(field.to_string(), pattern.clone()));
            }
            Condition::Range {
                greater_than,
                less_than,
            } => {
                let low = bound_present(*greater_than);
                let high = bound_present(*less_than);
                match (low, high) {
                    (Some(low), Some(high)) => {
                        predicates.push(Predicate::Between(field.to_string(), low, high));
                    }
                    (Some(low), None) => {
                        predicates.push(Predicate::GreaterThan(field.to_string(), low));
                    }
                    (None, Some(high)) => {
                        predicates.push(Predicate::LessThan(field.to_string(), high));
                    }
                    (None, None) => {}
                }
            }
        }
    }

    predicates
}

/// Translate a neutral sort specification; only the first entry is
/// honored by this backend.
#[must_use]
pub fn translate_sort(sort: &Sort) -> Option<(String, SortOrder)> {
    sort.first()
        .map(|(field, direction)| (field.to_string(), SortOrder::from_direction(direction)))
}
