//! Relational Data Access Service
//!
//! Composes the connection manager, the relational criteria translator and
//! the driver into the [`DataService`] contract.
//!
//! Connect has one extra stage the document backend lacks: after a
//! successful authenticate, the sync step materializes the underlying
//! tables before the service becomes `Connected`. A sync failure counts as
//! a failed attempt and retries like any other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::{ConnectionManager, RetryPolicy};
use crate::criteria::{Search, Sort};
use crate::entity::Entity;
use crate::error::{DbError, DbResult};
use crate::logger::Logger;
use crate::schema::SchemaDescriptor;
use crate::service::DataService;
use crate::value::Value;

use super::driver::{RelationalDriver, TableModel};
use super::memory::MemoryRelationalDriver;
use super::query::{translate_search, translate_sort, Predicate, SelectQuery};

const SCOPE: &str = "RelationalService";
const SCOPE_FIND: &str = "RelationalService findAll";

/// The relational-backend implementation of the data access contract.
pub struct RelationalService<D = MemoryRelationalDriver> {
    driver: D,
    manager: ConnectionManager<TableModel>,
    retry: RetryPolicy,
}

impl RelationalService<MemoryRelationalDriver> {
    /// Service over a fresh in-memory driver.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MemoryRelationalDriver::new())
    }
}

impl<D: RelationalDriver> RelationalService<D> {
    /// Service over the given driver, with the contract retry policy.
    #[must_use]
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            manager: ConnectionManager::new(),
            retry: RetryPolicy::new(),
        }
    }

    /// Override the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Access the underlying driver.
    #[must_use]
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// One connect attempt: authenticate, then materialize storage.
    async fn attempt(&self, connection: &str, tables: &[TableModel], logger: &Arc<dyn Logger>) -> DbResult<()> {
        self.driver.authenticate(connection).await?;
        logger.debug(SCOPE, "connection successful");

        self.driver.sync(tables).await
    }
}

#[async_trait]
impl<D: RelationalDriver> DataService for RelationalService<D> {
    async fn connect(
        &self,
        logger: Arc<dyn Logger>,
        connection: &str,
        schemas: Vec<SchemaDescriptor>,
    ) -> DbResult<()> {
        self.manager.begin(Arc::clone(&logger)).await;

        let tables: Vec<TableModel> = schemas.iter().map(TableModel::from_schema).collect();

        let mut attempts: u32 = 0;
        loop {
            logger.debug(SCOPE, "attempting to connect to relational store...");

            match self.attempt(connection, &tables, &logger).await {
                Ok(()) => {
                    logger.info(SCOPE, "relational store connected");

                    let mappings: HashMap<String, TableModel> = tables
                        .iter()
                        .map(|table| (table.name.clone(), table.clone()))
                        .collect();
                    self.manager.complete(mappings).await;

                    return Ok(());
                }
                Err(err) => {
                    attempts += 1;
                    logger.error(
                        SCOPE,
                        &format!("failed to connect to relational store - {err}"),
                    );

                    if !self.retry.allows_another(attempts) {
                        self.manager.clear().await;
                        return Err(DbError::connection(format!(
                            "gave up after {attempts} attempts"
                        )));
                    }
                    tokio::time::sleep(self.retry.delay()).await;
                }
            }
        }
    }

    async fn disconnect(&self) {
        let logger = self.manager.logger().await;

        if !self.manager.is_active().await {
            if let Some(logger) = &logger {
                logger.error(SCOPE, "no relational store connection available to close");
            }
            return;
        }

        match self.driver.close().await {
            Ok(()) => {
                if let Some(logger) = &logger {
                    logger.debug(SCOPE, "relational store disconnected successfully");
                }
            }
            Err(err) => {
                if let Some(logger) = &logger {
                    logger.error(
                        SCOPE,
                        &format!("relational store failed to disconnect - {err}"),
                    );
                }
            }
        }

        self.manager.clear().await;
    }

    fn persists_on_create(&self) -> bool {
        true
    }

    async fn create(
        &self,
        entity_type: &str,
        values: HashMap<String, Value>,
    ) -> DbResult<Entity> {
        let model = self.manager.model(entity_type).await?;

        let mut entity = Entity::new(entity_type, values);
        // Creation persists immediately on this backend
        self.driver
            .upsert(&model, &mut entity)
            .await
            .map_err(|err| DbError::instantiation(err.to_string()))?;

        Ok(entity)
    }

    async fn save(&self, entity: &mut Entity) -> DbResult<bool> {
        let model = self.manager.model(entity.entity_type()).await?;
        self.driver.upsert(&model, entity).await?;
        Ok(true)
    }

    async fn fetch(
        &self,
        entity_type: &str,
        prop: &str,
        value: Value,
    ) -> DbResult<Option<Entity>> {
        let model = self.manager.model(entity_type).await?;

        // Identity lookup and field lookup are both a primary-key-style
        // equality select here; `fetch` returns the first match.
        let query = SelectQuery {
            limit: Some(1),
            ..SelectQuery::filter(Predicate::Equals(prop.to_string(), value))
        };
        let mut results = self.driver.select(&model, &query).await?;
        Ok(if results.is_empty() {
            None
        } else {
            Some(results.remove(0))
        })
    }

    async fn fetch_all(
        &self,
        entity_type: &str,
        prop: Option<&str>,
        value: Option<Value>,
    ) -> DbResult<Vec<Entity>> {
        let model = self.manager.model(entity_type).await?;

        let query = match (prop, value) {
            (Some(prop), Some(value)) => {
                SelectQuery::filter(Predicate::Equals(prop.to_string(), value))
            }
            _ => SelectQuery::match_all(),
        };

        self.driver.select(&model, &query).await
    }

    async fn find_all(
        &self,
        entity_type: &str,
        search: Option<&Search>,
        sort: Option<&Sort>,
        start: Option<u64>,
        limit: Option<u64>,
    ) -> DbResult<Vec<Entity>> {
        let model = self.manager.model(entity_type).await?;
        let logger = self.manager.logger().await;

        let empty = Search::new();
        let mut query = SelectQuery {
            predicates: translate_search(search.unwrap_or(&empty)),
            ..SelectQuery::match_all()
        };
        if let Some(logger) = &logger {
            logger.debug(
                SCOPE_FIND,
                &format!(
                    "performing search - {}",
                    query.where_sql().unwrap_or_else(|| "match all".to_string())
                ),
            );
        }

        if let Some(sort) = sort {
            let translated = translate_sort(sort);
            if let Some(logger) = &logger {
                logger.debug(SCOPE_FIND, &format!("sorting - {translated:?}"));
            }
            query.order = translated;
        }
        if let Some(start) = start.filter(|start| *start > 0) {
            if let Some(logger) = &logger {
                logger.debug(SCOPE_FIND, &format!("skipping - {start}"));
            }
            query.offset = Some(start);
        }
        if let Some(limit) = limit.filter(|limit| *limit > 0) {
            if let Some(logger) = &logger {
                logger.debug(SCOPE_FIND, &format!("limiting - {limit}"));
            }
            query.limit = Some(limit);
        }

        self.driver.select(&model, &query).await
    }

    async fn remove(&self, entity: &Entity) -> DbResult<bool> {
        let model = self.manager.model(entity.entity_type()).await?;

        if let Some(id) = entity.id() {
            self.driver.delete(&model, id).await?;
        }
        Ok(true)
    }
}

// =============================================================================
// Tests
// =============================================================================
