//! Relational Driver Trait
//!
//! The collaborator boundary to an actual relational database:
//! authenticate/sync/close primitives plus row operations taking a
//! translated [`SelectQuery`].

use async_trait::async_trait;

use crate::entity::Entity;
use crate::error::DbResult;
use crate::schema::{FieldKind, SchemaDescriptor};

use super::query::SelectQuery;

/// Backend model handle for one registered entity type: the table and its
/// typed columns, derived from the schema descriptor at connect time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableModel {
    /// Table name (same as the entity type name)
    pub name: String,
    /// Column definitions in declaration order
    pub columns: Vec<(String, FieldKind)>,
}

impl TableModel {
    /// Derive the table model from a schema descriptor.
    #[must_use]
    pub fn from_schema(schema: &SchemaDescriptor) -> Self {
        Self {
            name: schema.name().to_string(),
            columns: schema.fields().to_vec(),
        }
    }

    /// True when the column is declared.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|(column, _)| column == name)
    }
}

/// Abstract relational store driver.
///
/// Write failures surface as [`DbError::Persistence`](crate::error::DbError);
/// authenticate/sync failures as [`DbError::Connection`](crate::error::DbError)
/// so the facade's retry loop can classify them.
#[async_trait]
pub trait RelationalDriver: Send + Sync {
    /// Verify credentials/reachability. One attempt; retrying is the
    /// facade's job.
    async fn authenticate(&self, connection: &str) -> DbResult<()>;

    /// Materialize storage for the given tables (`CREATE TABLE IF NOT
    /// EXISTS` semantics: existing rows survive).
    async fn sync(&self, tables: &[TableModel]) -> DbResult<()>;

    /// Close the connection.
    async fn close(&self) -> DbResult<()>;

    /// Insert or update one row, stamping its persistence timestamps.
    /// Properties must match declared columns.
    async fn upsert(&self, table: &TableModel, entity: &mut Entity) -> DbResult<()>;

    /// Execute a translated select.
    async fn select(&self, table: &TableModel, query: &SelectQuery) -> DbResult<Vec<Entity>>;

    /// Delete by identity. Returns true if the row existed.
    async fn delete(&self, table: &TableModel, id: &str) -> DbResult<bool>;
}
