//! Document Data Access Service
//!
//! Composes the connection manager, the document criteria translator and
//! the driver into the [`DataService`] contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::connection::{ConnectionManager, RetryPolicy};
use crate::constants::ID_PROPERTY;
use crate::criteria::{Search, Sort};
use crate::entity::Entity;
use crate::error::{DbError, DbResult};
use crate::logger::Logger;
use crate::schema::{FieldKind, SchemaDescriptor};
use crate::service::DataService;
use crate::value::Value;

use super::driver::DocumentDriver;
use super::memory::MemoryDocumentDriver;
use super::query::{translate_search, translate_sort, DocumentQuery, FindOptions};

const SCOPE: &str = "DocumentService";
const SCOPE_FIND: &str = "DocumentService findAll";

/// Backend model handle for one registered entity type.
///
/// Built once per successful connect; the schema rides along for
/// diagnostics but is not enforced on property access.
#[derive(Debug, Clone)]
pub struct DocumentModel {
    /// Collection name (same as the entity type name)
    pub name: String,
    /// Field definitions from the schema descriptor
    pub fields: Vec<(String, FieldKind)>,
}

/// The document-backend implementation of the data access contract.
pub struct DocumentService<D = MemoryDocumentDriver> {
    driver: D,
    manager: ConnectionManager<DocumentModel>,
    retry: RetryPolicy,
}

impl DocumentService<MemoryDocumentDriver> {
    /// Service over a fresh in-memory driver.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MemoryDocumentDriver::new())
    }
}

impl<D: DocumentDriver> DocumentService<D> {
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
}

#[async_trait]
impl<D: DocumentDriver> DataService for DocumentService<D> {
    async fn connect(
        &self,
        logger: Arc<dyn Logger>,
        connection: &str,
        schemas: Vec<SchemaDescriptor>,
    ) -> DbResult<()> {
        self.manager.begin(Arc::clone(&logger)).await;

        let mut attempts: u32 = 0;
        loop {
            logger.debug(SCOPE, "attempting to connect to document store...");

            match self.driver.connect(connection).await {
                Ok(()) => {
                    logger.info(SCOPE, "document store connected");

                    let mappings: HashMap<String, DocumentModel> = schemas
                        .iter()
                        .map(|schema| {
                            (
                                schema.name().to_string(),
                                DocumentModel {
                                    name: schema.name().to_string(),
                                    fields: schema.fields().to_vec(),
                                },
                            )
                        })
                        .collect();
                    self.manager.complete(mappings).await;

                    return Ok(());
                }
                Err(err) => {
                    attempts += 1;
                    logger.error(
                        SCOPE,
                        &format!("failed to connect to document store - {err}"),
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
                logger.error(SCOPE, "no document store connection available to close");
            }
            return;
        }

        match self.driver.disconnect().await {
            Ok(()) => {
                if let Some(logger) = &logger {
                    logger.debug(SCOPE, "document store disconnected successfully");
                }
            }
            Err(err) => {
                if let Some(logger) = &logger {
                    logger.error(SCOPE, &format!("document store failed to disconnect - {err}"));
                }
            }
        }

        self.manager.clear().await;
    }

    fn persists_on_create(&self) -> bool {
        false
    }

    async fn create(
        &self,
        entity_type: &str,
        values: HashMap<String, Value>,
    ) -> DbResult<Entity> {
        let _model = self.manager.model(entity_type).await?;

        // Creation is in-memory only for the document backend; the record
        // reaches the store on the first explicit save.
        Ok(Entity::new(entity_type, values))
    }

    async fn save(&self, entity: &mut Entity) -> DbResult<bool> {
        let model = self.manager.model(entity.entity_type()).await?;
        self.driver.upsert(&model.name, entity).await?;
        Ok(true)
    }

    async fn fetch(
        &self,
        entity_type: &str,
        prop: &str,
        value: Value,
    ) -> DbResult<Option<Entity>> {
        let model = self.manager.model(entity_type).await?;

        if prop == ID_PROPERTY {
            if let Value::Str(id) = &value {
                return self.driver.find_by_id(&model.name, id).await;
            }
        }

        let mut query = DocumentQuery::new();
        query.insert(prop.to_string(), value.to_json());
        self.driver.find_one(&model.name, &query).await
    }

    async fn fetch_all(
        &self,
        entity_type: &str,
        prop: Option<&str>,
        value: Option<Value>,
    ) -> DbResult<Vec<Entity>> {
        let model = self.manager.model(entity_type).await?;

        let mut query = DocumentQuery::new();
        if let (Some(prop), Some(value)) = (prop, value) {
            query.insert(prop.to_string(), value.to_json());
        }

        self.driver
            .find(&model.name, &query, &FindOptions::default())
            .await
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
        let query = translate_search(search.unwrap_or(&empty));
        if let Some(logger) = &logger {
            logger.debug(
                SCOPE_FIND,
                &format!(
                    "performing search - {}",
                    serde_json::Value::Object(query.clone())
                ),
            );
        }

        let mut options = FindOptions::default();
        if let Some(sort) = sort {
            let translated = translate_sort(sort);
            if let Some(logger) = &logger {
                logger.debug(SCOPE_FIND, &format!("sorting - {translated:?}"));
            }
            options.sort = translated;
        }
        if let Some(start) = start.filter(|start| *start > 0) {
            if let Some(logger) = &logger {
                logger.debug(SCOPE_FIND, &format!("skipping - {start}"));
            }
            options.skip = Some(start);
        }
        if let Some(limit) = limit.filter(|limit| *limit > 0) {
            if let Some(logger) = &logger {
                logger.debug(SCOPE_FIND, &format!("limiting - {limit}"));
            }
            options.limit = Some(limit);
        }

        self.driver.find(&model.name, &query, &options).await
    }

    async fn remove(&self, entity: &Entity) -> DbResult<bool> {
        let model = self.manager.model(entity.entity_type()).await?;

        if let Some(id) = entity.id() {
            self.driver.delete(&model.name, id).await?;
        }
        Ok(true)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{BufferLogger, LogLevel};

    fn schemas() -> Vec<SchemaDescriptor> {
        vec![SchemaDescriptor::new("book")
            .field("title", FieldKind::Text)
            .field("price", FieldKind::Number)]
    }

    async fn connected_service() -> (DocumentService, BufferLogger) {
        let service = DocumentService::memory();
        let logger = BufferLogger::new();
        service
            .connect(Arc::new(logger.clone()), "memory://books", schemas())
            .await
            .unwrap();
        (service, logger)
    }

    #[tokio::test]
    async fn test_operations_before_connect_are_not_connected() {
        let service = DocumentService::memory();

        let err = service.create("book", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, DbError::NotConnected));

        let err = service
            .fetch("book", "title", Value::from("dune"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotConnected));

        let err = service.fetch_all("book", None, None).await.unwrap_err();
        assert!(matches!(err, DbError::NotConnected));

        let err = service
            .find_all("book", None, None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotConnected));
    }

    #[tokio::test]
    async fn test_unregistered_entity_type_is_model_not_found() {
        let (service, _logger) = connected_service().await;

        let err = service.create("author", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, DbError::ModelNotFound { entity_type } if entity_type == "author"));
    }

    #[tokio::test]
    async fn test_create_is_unsaved_until_save() {
        let (service, _logger) = connected_service().await;
        assert!(!service.persists_on_create());

        let mut book = service.create("book", HashMap::new()).await.unwrap();
        service.set_prop(&mut book, "title", Some(Value::from("dune")));

        // Not in the store yet
        assert_eq!(service.driver().document_count("book"), 0);

        assert!(service.save(&mut book).await.unwrap());
        assert_eq!(service.driver().document_count("book"), 1);
    }

    #[tokio::test]
    async fn test_fetch_by_id_and_by_prop() {
        let (service, _logger) = connected_service().await;

        let mut book = service.create("book", HashMap::new()).await.unwrap();
        service.set_prop(&mut book, "title", Some(Value::from("dune")));
        service.save(&mut book).await.unwrap();

        let by_id = service
            .fetch("book", "id", Value::Str(book.id().unwrap().to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_id.get("title"), Some(Value::from("dune")));

        let by_prop = service
            .fetch("book", "title", Value::from("dune"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_prop.id(), book.id());

        let missing = service
            .fetch("book", "title", Value::from("emma"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_find_all_logs_only_search_without_modifiers() {
        let (service, logger) = connected_service().await;
        logger.clear();

        service
            .find_all("book", None, None, None, None)
            .await
            .unwrap();

        let lines = logger.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].level, LogLevel::Debug);
        assert_eq!(lines[0].scope, SCOPE_FIND);
        assert!(lines[0].message.starts_with("performing search - "));
    }

    #[tokio::test]
    async fn test_find_all_logs_each_applied_modifier() {
        let (service, logger) = connected_service().await;
        logger.clear();

        service
            .find_all(
                "book",
                Some(&Search::new().equals("title", "dune")),
                Some(&Sort::by("title", -1)),
                Some(1),
                Some(5),
            )
            .await
            .unwrap();

        let messages: Vec<String> = logger
            .lines()
            .into_iter()
            .map(|line| line.message)
            .collect();
        assert_eq!(messages.len(), 4);
        assert!(messages[0].starts_with("performing search - "));
        assert!(messages[1].starts_with("sorting - "));
        assert_eq!(messages[2], "skipping - 1");
        assert_eq!(messages[3], "limiting - 5");
    }

    #[tokio::test]
    async fn test_find_all_zero_start_and_limit_are_absent() {
        let (service, logger) = connected_service().await;
        logger.clear();

        service
            .find_all("book", None, None, Some(0), Some(0))
            .await
            .unwrap();

        // Zero modifiers are not applied and not logged
        assert_eq!(logger.lines().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unsaved_entity_is_noop_success() {
        let (service, _logger) = connected_service().await;

        let book = service.create("book", HashMap::new()).await.unwrap();
        assert!(service.remove(&book).await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_deletes_saved_entity() {
        let (service, _logger) = connected_service().await;

        let mut book = service.create("book", HashMap::new()).await.unwrap();
        service.save(&mut book).await.unwrap();
        assert_eq!(service.driver().document_count("book"), 1);

        assert!(service.remove(&book).await.unwrap());
        assert_eq!(service.driver().document_count("book"), 0);
    }

    #[tokio::test]
    async fn test_disconnect_clears_mapping_table() {
        let (service, logger) = connected_service().await;

        service.disconnect().await;

        assert_eq!(logger.count(LogLevel::Error), 0);
        let err = service.create("book", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, DbError::NotConnected));
    }

    #[tokio::test]
    async fn test_disconnect_never_connected_logs_error_and_resolves() {
        let service = DocumentService::memory();

        // No logger was ever supplied; still resolves
        service.disconnect().await;
    }

    #[tokio::test]
    async fn test_disconnect_resolves_on_driver_failure() {
        let (service, logger) = connected_service().await;
        service.driver().fail_disconnect(true);

        service.disconnect().await;

        assert_eq!(logger.count(LogLevel::Error), 1);
        // State still cleared: shutdown proceeds regardless
        let err = service.create("book", HashMap::new()).await.unwrap_err();
        assert!(matches!(err, DbError::NotConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_retries_until_store_is_available() {
        let service = DocumentService::memory();
        service.driver().fail_next_connects(2);
        let logger = BufferLogger::new();

        service
            .connect(Arc::new(logger.clone()), "memory://books", schemas())
            .await
            .unwrap();

        // One error line per failed attempt, success on the third
        assert_eq!(logger.count(LogLevel::Error), 2);
        assert_eq!(logger.count(LogLevel::Info), 1);
        assert!(service.create("book", HashMap::new()).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_does_not_resolve_while_store_is_down() {
        let service = DocumentService::memory();
        let logger = BufferLogger::new();

        // Empty connection string fails every attempt
        let pending = service.connect(Arc::new(logger.clone()), "", schemas());
        let result =
            tokio::time::timeout(std::time::Duration::from_millis(100), pending).await;

        assert!(result.is_err(), "connect must not resolve on failure");
        assert_eq!(logger.count(LogLevel::Error), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retry_policy_surfaces_connection_error() {
        let service =
            DocumentService::memory().with_retry(RetryPolicy::new().with_max_attempts(3));
        let logger = BufferLogger::new();

        let err = service
            .connect(Arc::new(logger.clone()), "", schemas())
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Connection { .. }));
        assert_eq!(logger.count(LogLevel::Error), 3);
    }
}
