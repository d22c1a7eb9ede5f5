//! In-Memory Document Driver
//!
//! `TigerStyle`: Deterministic, dependency-free driver for testing and
//! embedded use. Documents live in per-collection vectors in insertion
//! order; queries are evaluated against the translated operator map the
//! same way a document database would.
//!
//! Failure injection is deterministic (counters and flags, no
//! probabilities) so connection-retry tests can script exact outcomes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;

use crate::constants::FIND_LIMIT_MAX;
use crate::criteria::SortOrder;
use crate::entity::Entity;
use crate::error::{DbError, DbResult};
use crate::value::Value;

use super::driver::DocumentDriver;
use super::query::{DocumentQuery, FindOptions};

// =============================================================================
// MemoryDocumentDriver
// =============================================================================

/// In-memory document store driver.
#[derive(Debug, Default)]
pub struct MemoryDocumentDriver {
    collections: Arc<RwLock<HashMap<String, Vec<Entity>>>>,
    connect_failures: AtomicU32,
    fail_disconnect: AtomicBool,
    fail_writes: AtomicBool,
    find_calls: AtomicU32,
}

impl MemoryDocumentDriver {
    /// Create an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` connect attempts (simulates the store coming
    /// up late).
    pub fn fail_next_connects(&self, count: u32) {
        self.connect_failures.store(count, AtomicOrdering::SeqCst);
    }

    /// Make disconnect fail.
    pub fn fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Number of `find` executions so far (for testing).
    #[must_use]
    pub fn find_calls(&self) -> u32 {
        self.find_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of documents in a collection (for testing).
    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .unwrap()
            .get(collection)
            .map_or(0, Vec::len)
    }
}

// =============================================================================
// Query Evaluation
// =============================================================================

fn is_operator_object(ops: &serde_json::Map<String, serde_json::Value>) -> bool {
    !ops.is_empty() && ops.keys().all(|key| key.starts_with('$'))
}

fn eval_operator(actual: Option<&Value>, op: &str, operand: &serde_json::Value) -> bool {
    match op {
        "$gt" => match (actual.and_then(Value::as_f64), operand.as_f64()) {
            (Some(actual), Some(bound)) => actual > bound,
            _ => false,
        },
        "$lt" => match (actual.and_then(Value::as_f64), operand.as_f64()) {
            (Some(actual), Some(bound)) => actual < bound,
            _ => false,
        },
        "$regex" => match (actual.and_then(Value::as_str), operand.as_str()) {
            (Some(actual), Some(pattern)) => {
                Regex::new(pattern).map_or(false, |regex| regex.is_match(actual))
            }
            _ => false,
        },
        _ => false,
    }
}

fn matches_query(entity: &Entity, query: &DocumentQuery) -> bool {
    query.iter().all(|(field, clause)| {
        let actual = entity.get(field);
        match clause {
            serde_json::Value::Object(ops) if is_operator_object(ops) => ops
                .iter()
                .all(|(op, operand)| eval_operator(actual.as_ref(), op, operand)),
            other => actual.map(|value| value.to_json()).as_ref() == Some(other),
        }
    })
}

fn compare_by_keys(a: &Entity, b: &Entity, sort: &[(String, SortOrder)]) -> std::cmp::Ordering {
    for (field, order) in sort {
        let ordering = match (a.get(field), b.get(field)) {
            (None, None) => std::cmp::Ordering::Equal,
            (None, Some(_)) => std::cmp::Ordering::Less,
            (Some(_), None) => std::cmp::Ordering::Greater,
            (Some(left), Some(right)) => left.compare(&right),
        };
        let ordering = match order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        };
        if ordering != std::cmp::Ordering::Equal {
            return ordering;
        }
    }
    std::cmp::Ordering::Equal
}

// =============================================================================
// DocumentDriver Implementation
// =============================================================================

#[async_trait]
impl DocumentDriver for MemoryDocumentDriver {
    async fn connect(&self, connection: &str) -> DbResult<()> {
        if connection.is_empty() {
            return Err(DbError::connection("empty connection string"));
        }

        let remaining = self.connect_failures.load(AtomicOrdering::SeqCst);
        if remaining > 0 {
            self.connect_failures
                .store(remaining - 1, AtomicOrdering::SeqCst);
            return Err(DbError::connection("document store unavailable"));
        }

        Ok(())
    }

    async fn disconnect(&self) -> DbResult<()> {
        if self.fail_disconnect.load(AtomicOrdering::SeqCst) {
            return Err(DbError::connection("document store refused to disconnect"));
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, entity: &mut Entity) -> DbResult<()> {
        // Precondition
        assert!(entity.id().is_some(), "entity must have id before upsert");

        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(DbError::persistence("document store rejected write"));
        }

        entity.touch(Utc::now());

        let mut collections = self.collections.write().unwrap();
        let documents = collections.entry(collection.to_string()).or_default();

        match documents
            .iter_mut()
            .find(|existing| existing.id() == entity.id())
        {
            Some(existing) => *existing = entity.clone(),
            None => documents.push(entity.clone()),
        }

        Ok(())
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Entity>> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|entity| entity.id() == Some(id)))
            .cloned())
    }

    async fn find_one(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> DbResult<Option<Entity>> {
        let collections = self.collections.read().unwrap();
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.iter().find(|entity| matches_query(entity, query)))
            .cloned())
    }

    async fn find(
        &self,
        collection: &str,
        query: &DocumentQuery,
        options: &FindOptions,
    ) -> DbResult<Vec<Entity>> {
        self.find_calls.fetch_add(1, AtomicOrdering::SeqCst);

        // Precondition
        if let Some(limit) = options.limit {
            assert!(
                limit <= FIND_LIMIT_MAX,
                "limit {limit} cannot exceed {FIND_LIMIT_MAX}"
            );
        }

        let collections = self.collections.read().unwrap();
        let mut results: Vec<Entity> = collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|entity| matches_query(entity, query))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if !options.sort.is_empty() {
            results.sort_by(|a, b| compare_by_keys(a, b, &options.sort));
        }

        let skip = usize::try_from(options.skip.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = options
            .limit
            .and_then(|limit| usize::try_from(limit).ok())
            .unwrap_or(usize::MAX);

        Ok(results.into_iter().skip(skip).take(take).collect())
    }

    async fn delete(&self, collection: &str, id: &str) -> DbResult<bool> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(DbError::persistence("document store rejected delete"));
        }

        let mut collections = self.collections.write().unwrap();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(false);
        };

        let before = documents.len();
        documents.retain(|entity| entity.id() != Some(id));
        Ok(documents.len() < before)
    }
}

// =============================================================================
// Tests
// =============================================================================
