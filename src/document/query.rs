//! Document Criteria Translation
//!
//! Pure function from the neutral criteria to the document store's native
//! operator vocabulary. All per-field clauses merge into one flat query
//! object; an empty object matches everything.
//!
//! Range bounds translate to independent `$gt`/`$lt` sub-clauses, both
//! exclusive. The relational backend renders one inclusive `BETWEEN`
//! instead; callers must not rely on boundary inclusivity.

use serde_json::json;

use crate::criteria::{bound_present, Condition, Search, Sort, SortOrder};

/// A translated document query: one flat map of field clauses.
pub type DocumentQuery = serde_json::Map<String, serde_json::Value>;

/// Sort/offset/limit modifiers applied before execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// Sort keys in priority order (every entry honored)
    pub sort: Vec<(String, SortOrder)>,
    /// Matching records to skip before the first result
    pub skip: Option<u64>,
    /// Result count cap
    pub limit: Option<u64>,
}

/// Translate neutral search criteria into a document query.
///
/// Unset fields emit nothing; a range with no truthy bound emits nothing.
#[must_use]
pub fn translate_search(search: &Search) -> DocumentQuery {
    let mut query = DocumentQuery::new();

    for (field, condition) in search.iter() {
        let Some(condition) = condition else {
            continue;
        };

        match condition {
            Condition::Equals(value) => {
                query.insert(field.to_string(), value.to_json());
            }
            Condition::Matches(pattern) => {
                query.insert(field.to_string(), json!({ "$regex": pattern }));
            }
            Condition::Range {
                greater_than,
                less_than,
            } => {
                let mut ops = serde_json::Map::new();
                if let Some(bound) = bound_present(*greater_than) {
                    ops.insert("$gt".to_string(), json!(bound));
                }
                if let Some(bound) = bound_present(*less_than) {
                    ops.insert("$lt".to_string(), json!(bound));
                }
                if !ops.is_empty() {
                    query.insert(field.to_string(), serde_json::Value::Object(ops));
                }
            }
        }
    }

    query
}

/// Translate a neutral sort specification; every entry is honored.
#[must_use]
pub fn translate_sort(sort: &Sort) -> Vec<(String, SortOrder)> {
    sort.iter()
        .map(|(field, direction)| (field.to_string(), SortOrder::from_direction(direction)))
        .collect()
}
