//! Document Driver Trait
//!
//! The collaborator boundary to an actual document database. The facade
//! treats the driver as opaque: connect/disconnect primitives plus
//! find/find-one/find-by-id with query and modifier structures already
//! translated to the document vocabulary.

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::DbResult;

use super::query::{DocumentQuery, FindOptions};

/// Abstract document store driver.
///
/// Write failures surface as [`DbError::Persistence`](crate::error::DbError);
/// connect failures as [`DbError::Connection`](crate::error::DbError) so the
/// facade's retry loop can classify them.
#[async_trait]
pub trait DocumentDriver: Send + Sync {
    /// Establish a connection. One attempt; retrying is the facade's job.
    async fn connect(&self, connection: &str) -> DbResult<()>;

    /// Tear the connection down.
    async fn disconnect(&self) -> DbResult<()>;

    /// Store or update a document, stamping its persistence timestamps.
    async fn upsert(&self, collection: &str, entity: &mut Entity) -> DbResult<()>;

    /// Identity lookup.
    async fn find_by_id(&self, collection: &str, id: &str) -> DbResult<Option<Entity>>;

    /// First document matching a query.
    async fn find_one(
        &self,
        collection: &str,
        query: &DocumentQuery,
    ) -> DbResult<Option<Entity>>;

    /// Every document matching a query, with modifiers applied before
    /// execution.
    async fn find(
        &self,
        collection: &str,
        query: &DocumentQuery,
        options: &FindOptions,
    ) -> DbResult<Vec<Entity>>;

    /// Delete by identity. Returns true if the document existed.
    async fn delete(&self, collection: &str, id: &str) -> DbResult<bool>;
}
