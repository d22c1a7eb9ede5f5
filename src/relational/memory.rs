//! In-Memory Relational Driver
//!
//! `TigerStyle`: Deterministic, dependency-free driver for testing and
//! embedded use. Rows live per table in insertion order; predicates are
//! evaluated with SQL comparison semantics (`BETWEEN` inclusive, `>`/`<`
//! strict, `~` as a regular-expression match).
//!
//! Unknown columns are rejected at write time, the way a relational store
//! rejects an undeclared column.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;

use crate::constants::{FIND_LIMIT_MAX, ID_PROPERTY};
use crate::criteria::SortOrder;
use crate::entity::Entity;
use crate::error::{DbError, DbResult};
use crate::value::Value;

use super::driver::{RelationalDriver, TableModel};
use super::query::{Predicate, SelectQuery};

// =============================================================================
// MemoryRelationalDriver
// =============================================================================

struct TableState {
    model: TableModel,
    rows: Vec<Entity>,
}

/// In-memory relational store driver.
#[derive(Default)]
pub struct MemoryRelationalDriver {
    tables: Arc<RwLock<HashMap<String, TableState>>>,
    auth_failures: AtomicU32,
    sync_failures: AtomicU32,
    fail_close: AtomicBool,
    fail_writes: AtomicBool,
    select_calls: AtomicU32,
}

impl MemoryRelationalDriver {
    /// Create an empty driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` authenticate attempts.
    pub fn fail_next_authenticates(&self, count: u32) {
        self.auth_failures.store(count, AtomicOrdering::SeqCst);
    }

    /// Fail the next `count` sync attempts.
    pub fn fail_next_syncs(&self, count: u32) {
        self.sync_failures.store(count, AtomicOrdering::SeqCst);
    }

    /// Make close fail.
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, AtomicOrdering::SeqCst);
    }

    /// Make writes fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, AtomicOrdering::SeqCst);
    }

    /// Number of `select` executions so far (for testing).
    #[must_use]
    pub fn select_calls(&self) -> u32 {
        self.select_calls.load(AtomicOrdering::SeqCst)
    }

    /// Number of rows in a table (for testing).
    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .read()
            .unwrap()
            .get(table)
            .map_or(0, |state| state.rows.len())
    }
}

// =============================================================================
// Predicate Evaluation
// =============================================================================

fn eval_predicate(entity: &Entity, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Equals(field, expected) => entity.get(field).as_ref() == Some(expected),
        Predicate::Matches(field, pattern) => match entity.get(field) {
            Some(Value::Str(actual)) => {
                Regex::new(pattern).map_or(false, |regex| regex.is_match(&actual))
            }
            _ => false,
        },
        Predicate::Between(field, low, high) => match entity.get(field).as_ref().and_then(Value::as_f64)
        {
            Some(actual) => actual >= *low && actual <= *high,
            None => false,
        },
        Predicate::GreaterThan(field, bound) => {
            match entity.get(field).as_ref().and_then(Value::as_f64) {
                Some(actual) => actual > *bound,
                None => false,
            }
        }
        Predicate::LessThan(field, bound) => {
            match entity.get(field).as_ref().and_then(Value::as_f64) {
                Some(actual) => actual < *bound,
                None => false,
            }
        }
    }
}

fn compare_by_key(a: &Entity, b: &Entity, field: &str, order: SortOrder) -> std::cmp::Ordering {
    let ordering = match (a.get(field), b.get(field)) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(left), Some(right)) => left.compare(&right),
    };
    match order {
        SortOrder::Ascending => ordering,
        SortOrder::Descending => ordering.reverse(),
    }
}

// =============================================================================
// RelationalDriver Implementation
// =============================================================================

#[async_trait]
impl RelationalDriver for MemoryRelationalDriver {
    async fn authenticate(&self, connection: &str) -> DbResult<()> {
        if connection.is_empty() {
            return Err(DbError::connection("empty connection string"));
        }

        let remaining = self.auth_failures.load(AtomicOrdering::SeqCst);
        if remaining > 0 {
            self.auth_failures
                .store(remaining - 1, AtomicOrdering::SeqCst);
            return Err(DbError::connection("relational store unavailable"));
        }

        Ok(())
    }

    async fn sync(&self, tables: &[TableModel]) -> DbResult<()> {
        let remaining = self.sync_failures.load(AtomicOrdering::SeqCst);
        if remaining > 0 {
            self.sync_failures
                .store(remaining - 1, AtomicOrdering::SeqCst);
            return Err(DbError::connection("failed to materialize tables"));
        }

        let mut state = self.tables.write().unwrap();
        for model in tables {
            match state.get_mut(&model.name) {
                Some(existing) => existing.model = model.clone(),
                None => {
                    state.insert(
                        model.name.clone(),
                        TableState {
                            model: model.clone(),
                            rows: Vec::new(),
                        },
                    );
                }
            }
        }
        Ok(())
    }

    async fn close(&self) -> DbResult<()> {
        if self.fail_close.load(AtomicOrdering::SeqCst) {
            return Err(DbError::connection("relational store refused to close"));
        }
        Ok(())
    }

    async fn upsert(&self, table: &TableModel, entity: &mut Entity) -> DbResult<()> {
        // Precondition
        assert!(entity.id().is_some(), "entity must have id before upsert");

        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(DbError::persistence("relational store rejected write"));
        }

        // Undeclared columns are a backend rejection, not a silent drop
        for prop in entity.properties() {
            if prop != ID_PROPERTY && !table.has_column(prop) {
                return Err(DbError::persistence(format!(
                    "unknown column {prop} for table {}",
                    table.name
                )));
            }
        }

        entity.touch(Utc::now());

        let mut tables = self.tables.write().unwrap();
        let Some(state) = tables.get_mut(&table.name) else {
            return Err(DbError::persistence(format!(
                "no such table {}",
                table.name
            )));
        };

        match state
            .rows
            .iter_mut()
            .find(|existing| existing.id() == entity.id())
        {
            Some(existing) => *existing = entity.clone(),
            None => state.rows.push(entity.clone()),
        }

        Ok(())
    }

    async fn select(&self, table: &TableModel, query: &SelectQuery) -> DbResult<Vec<Entity>> {
        self.select_calls.fetch_add(1, AtomicOrdering::SeqCst);

        // Precondition
        if let Some(limit) = query.limit {
            assert!(
                limit <= FIND_LIMIT_MAX,
                "limit {limit} cannot exceed {FIND_LIMIT_MAX}"
            );
        }

        let tables = self.tables.read().unwrap();
        let Some(state) = tables.get(&table.name) else {
            return Err(DbError::persistence(format!(
                "no such table {}",
                table.name
            )));
        };

        let mut results: Vec<Entity> = state
            .rows
            .iter()
            .filter(|row| {
                query
                    .predicates
                    .iter()
                    .all(|predicate| eval_predicate(row, predicate))
            })
            .cloned()
            .collect();

        if let Some((field, order)) = &query.order {
            results.sort_by(|a, b| compare_by_key(a, b, field, *order));
        }

        let skip = usize::try_from(query.offset.unwrap_or(0)).unwrap_or(usize::MAX);
        let take = query
            .limit
            .and_then(|limit| usize::try_from(limit).ok())
            .unwrap_or(usize::MAX);

        Ok(results.into_iter().skip(skip).take(take).collect())
    }

    async fn delete(&self, table: &TableModel, id: &str) -> DbResult<bool> {
        // Precondition
        assert!(!id.is_empty(), "id cannot be empty");

        if self.fail_writes.load(AtomicOrdering::SeqCst) {
            return Err(DbError::persistence("relational store rejected delete"));
        }

        let mut tables = self.tables.write().unwrap();
        let Some(state) = tables.get_mut(&table.name) else {
            return Ok(false);
        };

        let before = state.rows.len();
        state.rows.retain(|row| row.id() != Some(id));
        Ok(state.rows.len() < before)
    }
}

// =============================================================================
// Tests
// =============================================================================
