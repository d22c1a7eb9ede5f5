//! Data Access Service Contract
//!
//! One contract, implemented once per backend. Application code works
//! against `dyn DataService` and never learns which store is active.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     DataService Trait                        │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲                                ▲
//!          │                                │
//! ┌────────┴────────┐              ┌────────┴────────┐
//! │ DocumentService │              │RelationalService│
//! │ (operator maps) │              │ (SQL predicates)│
//! └─────────────────┘              └─────────────────┘
//! ```
//!
//! The two implementations are structurally independent; they share only
//! the neutral criteria input shape, because the translated query
//! vocabulary is irreducibly backend-specific.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::criteria::{Search, Sort};
use crate::entity::Entity;
use crate::error::DbResult;
use crate::logger::Logger;
use crate::schema::SchemaDescriptor;
use crate::value::Value;

/// The backend-agnostic data access contract.
///
/// All I/O methods suspend; none spawn internal parallelism. Entity
/// handles returned by one service must not be used after that service
/// disconnects.
#[async_trait]
pub trait DataService: Send + Sync {
    /// Connect to the store and register entity schemas.
    ///
    /// Retries until an attempt succeeds (3000 ms fixed interval, no
    /// ceiling unless the implementation was built with a bounded
    /// [`RetryPolicy`](crate::connection::RetryPolicy)): callers perceive
    /// only latency, never failure, while the store is unavailable.
    ///
    /// Calling connect again while a connect is in flight is a caller
    /// error with undefined behavior.
    async fn connect(
        &self,
        logger: Arc<dyn Logger>,
        connection: &str,
        schemas: Vec<SchemaDescriptor>,
    ) -> DbResult<()>;

    /// Disconnect from the store.
    ///
    /// Always resolves, regardless of backend cooperation: shutdown must
    /// proceed. Safe to call when never connected.
    async fn disconnect(&self);

    /// Whether `create` persists the record immediately.
    ///
    /// The relational backend persists on create; the document backend
    /// returns an in-memory instance pending an explicit `save`. Callers
    /// must handle the difference; it is a documented capability, not a
    /// bug.
    fn persists_on_create(&self) -> bool;

    /// Create a new instance of an entity type.
    async fn create(
        &self,
        entity_type: &str,
        values: HashMap<String, Value>,
    ) -> DbResult<Entity>;

    /// Set a property on an entity; `None` removes it. Never fails.
    fn set_prop(&self, entity: &mut Entity, prop: &str, value: Option<Value>) {
        entity.set(prop, value);
    }

    /// Get a property from an entity.
    fn get_prop(&self, entity: &Entity, prop: &str) -> Option<Value> {
        entity.get(prop)
    }

    /// Save an entity back to the store. Returns `true` on success.
    async fn save(&self, entity: &mut Entity) -> DbResult<bool>;

    /// Fetch the first entity whose property matches the value.
    ///
    /// When `prop` is the identity property (`id`), uses identity lookup.
    async fn fetch(
        &self,
        entity_type: &str,
        prop: &str,
        value: Value,
    ) -> DbResult<Option<Entity>>;

    /// Fetch all entities of a type, optionally filtered by one property.
    async fn fetch_all(
        &self,
        entity_type: &str,
        prop: Option<&str>,
        value: Option<Value>,
    ) -> DbResult<Vec<Entity>>;

    /// Find all entities matching neutral criteria, with optional sort,
    /// offset and limit. Results are eagerly materialized.
    async fn find_all(
        &self,
        entity_type: &str,
        search: Option<&Search>,
        sort: Option<&Sort>,
        start: Option<u64>,
        limit: Option<u64>,
    ) -> DbResult<Vec<Entity>>;

    /// Remove an entity from the store. Returns `true` on success; an
    /// entity that was never persisted is a no-op success.
    async fn remove(&self, entity: &Entity) -> DbResult<bool>;
}
